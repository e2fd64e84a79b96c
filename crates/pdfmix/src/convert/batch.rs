//! Chunked batch processing against an expensive external engine.
//!
//! Files are split into chunks of at most `chunk_size`. For each chunk one
//! engine handle is acquired, every file in the chunk is converted through
//! it, and the handle is released before the next chunk starts. Release
//! runs on every exit path, including unwinding, through [`EngineSession`].

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::Result;
use crate::model::{ConversionResult, FileRef};
use crate::progress::{ProgressEvent, ProgressSink};

/// Stage label of per-file conversion progress events.
pub const CONVERTING_STAGE: &str = "Converting";

/// An external engine that converts files one chunk at a time.
///
/// `acquire` may do all the heavy lifting for the chunk up front (the
/// headless suite converts the whole chunk in one subprocess), in which
/// case `convert_one` only collects the result.
pub trait ChunkEngine {
    /// Live engine state for one chunk.
    type Handle;

    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Start the engine for `chunk`.
    fn acquire(&self, chunk: &[FileRef]) -> Result<Self::Handle>;

    /// Suppress interactive prompts. Failures are logged and ignored.
    fn disable_alerts(&self, _handle: &mut Self::Handle) -> Result<()> {
        Ok(())
    }

    /// Convert a single file to PDF bytes.
    fn convert_one(&self, handle: &mut Self::Handle, file: &FileRef) -> Result<Vec<u8>>;

    /// Shut the engine down.
    fn release(&self, handle: &mut Self::Handle) -> Result<()>;
}

/// Scoped ownership of one engine handle.
///
/// Dropping the session releases the engine. Release errors are logged,
/// never propagated.
pub struct EngineSession<'a, E: ChunkEngine> {
    engine: &'a E,
    handle: E::Handle,
    chunk: usize,
}

impl<'a, E: ChunkEngine> EngineSession<'a, E> {
    /// Acquire an engine for `files`.
    pub fn open(engine: &'a E, chunk: usize, files: &[FileRef]) -> Result<Self> {
        let handle = engine.acquire(files)?;
        debug!(engine = engine.name(), chunk, "engine acquired");
        Ok(Self {
            engine,
            handle,
            chunk,
        })
    }

    /// Mutable access to the live handle.
    pub fn handle(&mut self) -> &mut E::Handle {
        &mut self.handle
    }
}

impl<E: ChunkEngine> Drop for EngineSession<'_, E> {
    fn drop(&mut self) {
        match self.engine.release(&mut self.handle) {
            Ok(()) => debug!(engine = self.engine.name(), chunk = self.chunk, "engine released"),
            Err(e) => warn!(
                engine = self.engine.name(),
                chunk = self.chunk,
                error = %e,
                "failed to release engine"
            ),
        }
    }
}

/// Splits work into chunks and drives a [`ChunkEngine`] over them.
#[derive(Debug, Clone, Copy)]
pub struct BatchProcessor {
    chunk_size: usize,
}

impl Default for BatchProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl BatchProcessor {
    /// Create a processor. A chunk size of zero is treated as one.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Files per engine session.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Convert `files` chunk by chunk.
    ///
    /// Every file in `files` ends up in exactly one of the result lists.
    /// A chunk whose engine cannot be acquired marks all of its files
    /// failed and processing moves on to the next chunk.
    pub fn process<E: ChunkEngine>(
        &self,
        engine: &E,
        files: &[FileRef],
        sink: &dyn ProgressSink,
    ) -> ConversionResult {
        let mut result = ConversionResult::new();
        let mut seen = HashSet::new();
        let total = files.len();
        let mut done = 0;

        let chunks = files.len().div_ceil(self.chunk_size);
        for (index, chunk) in files.chunks(self.chunk_size).enumerate() {
            info!(
                engine = engine.name(),
                chunk = index + 1,
                chunks,
                files = chunk.len(),
                "processing chunk"
            );

            let mut session = match EngineSession::open(engine, index, chunk) {
                Ok(session) => session,
                Err(e) => {
                    warn!(engine = engine.name(), chunk = index + 1, error = %e, "chunk failed");
                    for file in chunk {
                        if seen.insert(file.id()) {
                            result.push_failure(file);
                        }
                    }
                    done += chunk.len();
                    sink.emit(
                        ProgressEvent::determinate(CONVERTING_STAGE, done, total)
                            .with_message(format!("Chunk {} failed: {e}", index + 1)),
                    );
                    continue;
                }
            };

            if let Err(e) = engine.disable_alerts(session.handle()) {
                warn!(engine = engine.name(), error = %e, "could not disable alerts");
            }

            for file in chunk {
                done += 1;
                if !seen.insert(file.id()) {
                    debug!(id = file.id(), "skipping already processed id");
                    continue;
                }

                match engine.convert_one(session.handle(), file) {
                    Ok(bytes) => result.push_success(file.id(), bytes),
                    Err(e) => {
                        warn!(
                            id = file.id(),
                            file = %file.file_name(),
                            error = %e,
                            "conversion failed"
                        );
                        result.push_failure(file);
                    }
                }

                sink.emit(
                    ProgressEvent::determinate(CONVERTING_STAGE, done, total)
                        .with_filename(file.file_name()),
                );
            }
        }

        result
    }
}
