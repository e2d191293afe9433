use std::io;
use tracing::Subscriber;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Hands each formatted event to a plain function as one line.
///
/// Used where there is no stderr, e.g. the browser console.
#[derive(Debug, Clone, Copy)]
pub struct LineSink {
    sink: fn(&str),
}

impl LineSink {
    pub fn new(sink: fn(&str)) -> Self {
        Self { sink }
    }
}

impl<'a> MakeWriter<'a> for LineSink {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter {
            buffer: Vec::new(),
            sink: self.sink,
        }
    }
}

/// Buffers one event and emits it when dropped.
pub struct LineWriter {
    buffer: Vec<u8>,
    sink: fn(&str),
}

impl io::Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.buffer);
        (self.sink)(line.trim_end());
    }
}

/// `INFO` and above, no timestamps or colours, one call to `sink` per event.
pub fn line_subscriber(sink: fn(&str)) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_writer(LineSink::new(sink))
        .with_max_level(LevelFilter::INFO)
        .with_ansi(false)
        .without_time()
        .finish()
}

/// Installs [`line_subscriber`] globally. A subscriber that is already installed stays.
pub fn init_line_logging(sink: fn(&str)) {
    let _ = tracing::subscriber::set_global_default(line_subscriber(sink));
}
