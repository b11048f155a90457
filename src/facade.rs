//! Async conversion facade backed by a dedicated worker thread.
//!
//! Backend pages are not `Send`, so the worker thread owns the page and
//! executes commands sent from async tasks. Callers get an async interface
//! over any backend without caring which engine sits behind it.

use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread;

use tokio::sync::oneshot;

use crate::backend::BackendKind;
use crate::error::{ConversionError, Result};
use crate::page::{create_page, DialogHandlers, LoadState, NetworkHook};
use crate::surface::{BitmapOutput, FilePrintSurface, MemoryPrintSurface, PrintSurface};
use crate::{Viewport, WebSettings};

enum Command {
    Load(String, oneshot::Sender<bool>),
    SetContent(String, String, oneshot::Sender<bool>),
    Title(oneshot::Sender<String>),
    LoadState(oneshot::Sender<LoadState>),
    Evaluate(String, oneshot::Sender<String>),
    SetDialogHandlers(DialogHandlers, oneshot::Sender<()>),
    SetNetworkHook(NetworkHook, oneshot::Sender<()>),
    ApplySettings(WebSettings, oneshot::Sender<()>),
    PrintToFile(PathBuf, oneshot::Sender<Result<()>>),
    PrintToMemory(oneshot::Sender<Result<Vec<u8>>>),
    RenderBitmap(Viewport, oneshot::Sender<BitmapOutput>),
    Close(oneshot::Sender<()>),
}

/// Async handle to one conversion page on a worker thread.
#[derive(Clone)]
pub struct Converter {
    cmd_tx: Sender<Command>,
}

fn canceled() -> ConversionError {
    ConversionError::system_error("conversion worker is gone")
}

impl Converter {
    /// Spawn a worker thread owning a page on the given backend.
    pub async fn new(kind: BackendKind, settings: WebSettings) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        thread::spawn(move || {
            // The page is created on the worker so non-Send engines stay put.
            let mut page = match create_page(kind, &settings) {
                Ok(page) => page,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };
            let _ = init_tx.send(Ok(()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Load(url, resp) => {
                        page.load(&url, Box::new(move |ok| {
                            let _ = resp.send(ok);
                        }));
                    }
                    Command::SetContent(html, base_url, resp) => {
                        page.set_content(
                            &html,
                            &base_url,
                            Box::new(move |ok| {
                                let _ = resp.send(ok);
                            }),
                        );
                    }
                    Command::Title(resp) => {
                        let _ = resp.send(page.title());
                    }
                    Command::LoadState(resp) => {
                        let _ = resp.send(page.load_state());
                    }
                    Command::Evaluate(code, resp) => {
                        page.evaluate_script(
                            &code,
                            Box::new(move |value| {
                                let _ = resp.send(value);
                            }),
                        );
                    }
                    Command::SetDialogHandlers(handlers, resp) => {
                        page.set_dialog_handlers(handlers);
                        let _ = resp.send(());
                    }
                    Command::SetNetworkHook(hook, resp) => {
                        page.set_network_hook(hook);
                        let _ = resp.send(());
                    }
                    Command::ApplySettings(settings, resp) => {
                        page.apply_settings(&settings);
                        let _ = resp.send(());
                    }
                    Command::PrintToFile(path, resp) => {
                        let mut surface = FilePrintSurface::new(&path);
                        let (done_tx, done_rx) = std::sync::mpsc::channel();
                        page.render_to_print_surface(
                            &mut surface,
                            Box::new(move |ok| {
                                let _ = done_tx.send(ok);
                            }),
                        );
                        let ok = done_rx.recv().unwrap_or(false);
                        let _ = resp.send(if ok {
                            Ok(())
                        } else {
                            Err(ConversionError::rendering_failed(&format!(
                                "printing to {} failed",
                                surface.describe()
                            )))
                        });
                    }
                    Command::PrintToMemory(resp) => {
                        let mut surface = MemoryPrintSurface::new();
                        let (done_tx, done_rx) = std::sync::mpsc::channel();
                        page.render_to_print_surface(
                            &mut surface,
                            Box::new(move |ok| {
                                let _ = done_tx.send(ok);
                            }),
                        );
                        let ok = done_rx.recv().unwrap_or(false);
                        let _ = resp.send(if ok {
                            Ok(surface.into_data())
                        } else {
                            Err(ConversionError::rendering_failed("in-memory printing failed"))
                        });
                    }
                    Command::RenderBitmap(size, resp) => {
                        let _ = resp.send(page.render_to_bitmap(size));
                    }
                    Command::Close(resp) => {
                        let _ = resp.send(());
                        break;
                    }
                }
            }
        });

        init_rx.await.map_err(|_| canceled())??;
        Ok(Self { cmd_tx })
    }

    /// Navigate and wait for the load to settle. `false` means the load
    /// failed or was superseded.
    pub async fn load(&self, url: &str) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Load(url.to_string(), tx))
            .map_err(|_| canceled())?;
        rx.await.map_err(|_| canceled())
    }

    pub async fn set_content(&self, html: &str, base_url: &str) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::SetContent(html.to_string(), base_url.to_string(), tx))
            .map_err(|_| canceled())?;
        rx.await.map_err(|_| canceled())
    }

    pub async fn title(&self) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Title(tx))
            .map_err(|_| canceled())?;
        rx.await.map_err(|_| canceled())
    }

    pub async fn load_state(&self) -> Result<LoadState> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::LoadState(tx))
            .map_err(|_| canceled())?;
        rx.await.map_err(|_| canceled())
    }

    pub async fn evaluate(&self, code: &str) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Evaluate(code.to_string(), tx))
            .map_err(|_| canceled())?;
        rx.await.map_err(|_| canceled())
    }

    pub async fn set_dialog_handlers(&self, handlers: DialogHandlers) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::SetDialogHandlers(handlers, tx))
            .map_err(|_| canceled())?;
        rx.await.map_err(|_| canceled())
    }

    pub async fn set_network_hook(&self, hook: NetworkHook) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::SetNetworkHook(hook, tx))
            .map_err(|_| canceled())?;
        rx.await.map_err(|_| canceled())
    }

    pub async fn apply_settings(&self, settings: WebSettings) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::ApplySettings(settings, tx))
            .map_err(|_| canceled())?;
        rx.await.map_err(|_| canceled())
    }

    /// Print the current document to a PDF file.
    pub async fn print_to_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::PrintToFile(path.into(), tx))
            .map_err(|_| canceled())?;
        rx.await.map_err(|_| canceled())?
    }

    /// Print the current document to PDF bytes in memory.
    pub async fn print_to_pdf(&self) -> Result<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::PrintToMemory(tx))
            .map_err(|_| canceled())?;
        rx.await.map_err(|_| canceled())?
    }

    /// Rasterize the current document at the given size.
    pub async fn render_bitmap(&self, size: Viewport) -> Result<BitmapOutput> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::RenderBitmap(size, tx))
            .map_err(|_| canceled())?;
        rx.await.map_err(|_| canceled())
    }

    /// Shut the worker down. Dropping the last handle also stops it.
    pub async fn close(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Close(tx))
            .map_err(|_| canceled())?;
        rx.await.map_err(|_| canceled())
    }
}
