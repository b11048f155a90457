//! pagepress command line interface.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use pagepress::{
    check_compatibility, create_page, validate_css, validate_html, BackendKind, ConversionError,
    FilePrintSurface, Severity, Viewport, WebSettings,
};

#[derive(Parser)]
#[command(name = "pagepress", version, about = "Convert HTML documents to PDF or images")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print errors without decoration or color.
    #[arg(long, global = true)]
    plain_errors: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an HTML document or URL to PDF (or PNG with --image).
    Convert {
        /// Input file path or http(s) URL.
        input: String,
        /// Output file path.
        output: String,
        /// Render backend: dom or cdp. Defaults to the best available.
        #[arg(long)]
        backend: Option<String>,
        /// Produce a PNG image instead of a PDF.
        #[arg(long)]
        image: bool,
        /// Disable JavaScript execution.
        #[arg(long)]
        disable_javascript: bool,
        /// Skip loading images.
        #[arg(long)]
        no_images: bool,
        /// Skip painting the page background.
        #[arg(long)]
        no_background: bool,
        /// Path to a user stylesheet applied to the document.
        #[arg(long)]
        user_stylesheet: Option<String>,
        /// Minimum font size in pixels.
        #[arg(long, default_value_t = 0)]
        min_font_size: u32,
        /// Viewport width in pixels.
        #[arg(long, default_value_t = 1024)]
        width: u32,
        /// Viewport height in pixels.
        #[arg(long, default_value_t = 768)]
        height: u32,
    },
    /// Validate an HTML or CSS file and report backend compatibility.
    Validate {
        /// Input file path.
        input: String,
        /// Backend to check CSS compatibility against.
        #[arg(long)]
        backend: Option<String>,
    },
    /// List the render backends available in this build.
    Backends,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let plain = cli.plain_errors;

    let outcome = match cli.command {
        Commands::Convert {
            input,
            output,
            backend,
            image,
            disable_javascript,
            no_images,
            no_background,
            user_stylesheet,
            min_font_size,
            width,
            height,
        } => convert(ConvertArgs {
            input,
            output,
            backend,
            image,
            disable_javascript,
            no_images,
            no_background,
            user_stylesheet,
            min_font_size,
            viewport: Viewport { width, height },
        }),
        Commands::Validate { input, backend } => validate(&input, backend.as_deref()),
        Commands::Backends => {
            list_backends();
            Ok(())
        }
    };

    if let Err(err) = outcome {
        let colored = !plain && std::io::stderr().is_terminal();
        if plain {
            eprintln!("{}", err.format_plain());
        } else {
            eprintln!("{}", err.format_for_display(colored));
        }
        std::process::exit(i32::from(err.code as u8));
    }
}

struct ConvertArgs {
    input: String,
    output: String,
    backend: Option<String>,
    image: bool,
    disable_javascript: bool,
    no_images: bool,
    no_background: bool,
    user_stylesheet: Option<String>,
    min_font_size: u32,
    viewport: Viewport,
}

fn pick_backend(requested: Option<&str>) -> Result<BackendKind, ConversionError> {
    match requested {
        Some(name) => {
            let kind: BackendKind = name
                .parse()
                .map_err(|_| ConversionError::invalid_option("--backend", name))?;
            if !pagepress::backend::global().is_available(kind) {
                return Err(ConversionError::backend_unavailable(kind.short_name()));
            }
            Ok(kind)
        }
        None => pagepress::default_backend()
            .ok_or_else(|| ConversionError::backend_unavailable("any")),
    }
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

fn convert(args: ConvertArgs) -> Result<(), ConversionError> {
    let kind = pick_backend(args.backend.as_deref())?;
    log::info!("converting with the {} backend", kind.display_name());

    let settings = WebSettings {
        load_images: !args.no_images,
        enable_javascript: !args.disable_javascript,
        minimum_font_size: args.min_font_size,
        user_style_sheet: args.user_stylesheet.unwrap_or_default(),
        background: !args.no_background,
        ..WebSettings::default()
    };

    let mut page = create_page(kind, &settings)?;
    page.set_viewport_size(args.viewport);

    // Local inputs get a compatibility pre-check; warnings never block.
    let target = if is_url(&args.input) {
        args.input.clone()
    } else {
        let path = Path::new(&args.input);
        if !path.exists() {
            return Err(ConversionError::file_not_found(&args.input));
        }
        if let Ok(content) = std::fs::read_to_string(path) {
            report_messages(&check_compatibility(&content, kind));
        }
        let absolute = path
            .canonicalize()
            .map_err(|_| ConversionError::file_not_found(&args.input))?;
        format!("file://{}", absolute.display())
    };

    let loaded = Arc::new(AtomicBool::new(false));
    let flag = loaded.clone();
    page.load(&target, Box::new(move |ok| flag.store(ok, Ordering::SeqCst)));
    if !loaded.load(Ordering::SeqCst) {
        return Err(ConversionError::rendering_failed(&format!(
            "loading {} failed",
            args.input
        )));
    }

    if args.image || args.output.to_ascii_lowercase().ends_with(".png") {
        let bitmap = page
            .render_to_bitmap(args.viewport)
            .image()
            .cloned()
            .ok_or_else(|| {
                ConversionError::rendering_failed(
                    "this backend cannot render bitmaps without an attached view",
                )
            })?;
        std::fs::write(&args.output, &bitmap.png_data).map_err(|e| {
            ConversionError::system_error(&format!("writing {}: {}", args.output, e))
        })?;
    } else {
        let mut surface = FilePrintSurface::new(&args.output);
        let printed = Arc::new(AtomicBool::new(false));
        let flag = printed.clone();
        page.render_to_print_surface(
            &mut surface,
            Box::new(move |ok| flag.store(ok, Ordering::SeqCst)),
        );
        if !printed.load(Ordering::SeqCst) {
            return Err(ConversionError::rendering_failed(&format!(
                "printing to {} failed",
                args.output
            )));
        }
    }

    println!("Wrote {}", args.output);
    Ok(())
}

fn report_messages(result: &pagepress::ValidationResult) {
    for message in &result.messages {
        let tag = match message.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        eprintln!("{}: {}", tag, message.message);
        if let Some(suggestion) = &message.suggestion {
            eprintln!("  hint: {}", suggestion);
        }
    }
}

fn validate(input: &str, backend: Option<&str>) -> Result<(), ConversionError> {
    let kind = pick_backend(backend)?;
    let content = std::fs::read_to_string(input)
        .map_err(|_| ConversionError::file_not_found(input))?;

    let structural = if input.to_ascii_lowercase().ends_with(".css") {
        validate_css(&content)
    } else {
        validate_html(&content)
    };
    let compatibility = check_compatibility(&content, kind);

    report_messages(&structural);
    report_messages(&compatibility);

    if !compatibility.detected_features.is_empty() {
        println!(
            "Detected features: {}",
            compatibility
                .detected_features
                .iter()
                .map(|f| f.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    if structural.is_valid() {
        println!(
            "{} is valid ({} warning(s))",
            input,
            structural.warning_count() + compatibility.warning_count()
        );
        Ok(())
    } else {
        Err(ConversionError::invalid_html(&format!(
            "{} failed validation with {} error(s)",
            input,
            structural.error_count()
        )))
    }
}

fn list_backends() {
    let default = pagepress::default_backend();
    let available = pagepress::available_backends();
    if available.is_empty() {
        println!("No render backends are compiled into this build.");
        return;
    }
    for kind in available {
        let marker = if Some(kind) == default { "*" } else { " " };
        println!("{} {} ({})", marker, kind.short_name(), kind.display_name());
        println!("    {}", kind.capability_summary());
    }
}
