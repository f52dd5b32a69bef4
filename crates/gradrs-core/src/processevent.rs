use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Debug)]
pub enum ProcessEvent {
    Read(ReadEvent),
    Progress(ProgressEvent),
    Done(Result<(), String>),
}

#[derive(Debug)]
pub enum ReadEvent {
    File(String),
    FileRows(String, usize),
    FileFail(String, String),
    /// A row the csv reader could not decode. It is skipped.
    RowFail { file: String, row: usize, reason: String },
}

#[derive(Debug)]
pub enum ProgressEvent {
    Records(usize),
}

pub trait ProcessEventSink {
    fn on_read_event(&mut self, ev: &ReadEvent);
    fn on_progress_event(&mut self, ev: &ProgressEvent);
    fn on_done(&mut self, res: &Result<(), String>);
}

impl ReadEvent {
    pub fn file_fail(file: impl AsRef<std::path::Path>, reason: impl Into<String>) -> Self {
        Self::FileFail(file.as_ref().to_string_lossy().into_owned(), reason.into())
    }

    pub fn row_fail(
        file: impl AsRef<std::path::Path>,
        row: usize,
        reason: impl Into<String>,
    ) -> Self {
        let file = file.as_ref().to_string_lossy().into_owned();
        Self::RowFail { file, row, reason: reason.into() }
    }
}

/// Route every event waiting in `receiver` to `sink` without blocking.
pub fn drain_progress_messages<T: ProcessEventSink>(
    sink: &mut T,
    receiver: &mut UnboundedReceiver<ProcessEvent>,
) {
    loop {
        match receiver.try_recv() {
            Ok(msg) => match msg {
                ProcessEvent::Read(ev) => sink.on_read_event(&ev),
                ProcessEvent::Progress(ev) => sink.on_progress_event(&ev),
                ProcessEvent::Done(res) => sink.on_done(&res),
            },
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        }
    }
}
