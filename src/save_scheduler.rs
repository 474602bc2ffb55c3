//! Deferred, coalesced saving of the customization store.
//!
//! Edits only mark a save as wanted. On the next tick the store is encoded on
//! the calling thread and the bytes are handed to a single writer thread, so
//! the UI thread never waits on the disk. At most one write is in flight at a
//! time; requests made meanwhile collapse into one follow-up write of the
//! latest state.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use jod_thread::JoinHandle;

use crate::{
    persist::{self, ErrorClass, PersistError, StoreFile},
    store::CustomizationStore,
};

/// Something the owner of the scheduler may want to tell the user about.
#[derive(Debug)]
pub enum SaveEvent {
    Saved,

    /// A transient failure. The write is tried again on the next tick.
    Retrying(PersistError),

    /// The write failed for good. Changes are kept and written again on the
    /// next request or on flush.
    Failed(PersistError),

    /// Persistence is impossible for the rest of the session. Customizations
    /// keep working in memory only.
    PersistenceDisabled(PersistError),
}

pub struct SaveScheduler {
    file: Arc<dyn StoreFile>,

    /// Hands encoded stores to the writer thread. Dropped first on shutdown
    /// so the writer's receive loop ends.
    job_sender: Option<Sender<Vec<u8>>>,
    result_receiver: Receiver<Result<(), PersistError>>,

    pending: bool,
    in_flight: bool,
    retried: bool,

    /// A previous write failed and nothing has succeeded since.
    unsaved: bool,
    memory_only: bool,

    /// Joined on drop, after `job_sender` is gone.
    #[allow(unused)]
    writer_thread: JoinHandle<()>,
}

impl SaveScheduler {
    pub fn new(file: Arc<dyn StoreFile>) -> Self {
        let (job_sender, job_receiver) = crossbeam_channel::bounded::<Vec<u8>>(1);
        let (result_sender, result_receiver) = crossbeam_channel::unbounded();
        let writer_file = Arc::clone(&file);

        let writer_thread = jod_thread::Builder::new()
            .name("FolderTint save thread".to_owned())
            .spawn(move || {
                log::trace!("Save thread started");

                for contents in job_receiver {
                    let result = writer_file.write(&contents);
                    if result_sender.send(result).is_err() {
                        break;
                    }
                }

                log::trace!("Save thread stopped");
            })
            .expect("Could not start save thread");

        Self {
            file,
            job_sender: Some(job_sender),
            result_receiver,
            pending: false,
            in_flight: false,
            retried: false,
            unsaved: false,
            memory_only: false,
            writer_thread,
        }
    }

    pub fn file(&self) -> &dyn StoreFile {
        self.file.as_ref()
    }

    /// Marks the store as needing a save. Cheap; the write happens on a later
    /// tick.
    pub fn request_save(&mut self) {
        if self.memory_only {
            return;
        }
        self.pending = true;
    }

    pub fn has_pending(&self) -> bool {
        self.pending
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn is_memory_only(&self) -> bool {
        self.memory_only
    }

    /// Collects a finished write, if any, and starts the next one when a save
    /// is wanted and the writer is free.
    pub fn tick(&mut self, store: &mut CustomizationStore) -> Option<SaveEvent> {
        let mut event = None;

        if self.in_flight {
            match self.result_receiver.try_recv() {
                Ok(result) => {
                    self.in_flight = false;
                    event = self.handle_result(result);
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    self.in_flight = false;
                    event = Some(self.disable(PersistError::WriterGone));
                }
            }
        }

        if self.pending && !self.in_flight && !self.memory_only {
            if let Some(failure) = self.start_write(store) {
                event = Some(failure);
            }
        }

        event
    }

    /// Waits for the write in flight, then synchronously writes anything not
    /// yet saved. Called on shutdown.
    pub fn flush(&mut self, store: &mut CustomizationStore) -> Result<(), PersistError> {
        if self.in_flight {
            self.in_flight = false;
            match self.result_receiver.recv() {
                Ok(result) => {
                    if let Some(SaveEvent::PersistenceDisabled(err)) = self.handle_result(result) {
                        return Err(err);
                    }
                }
                Err(_) => return Err(PersistError::WriterGone),
            }
        }

        if self.memory_only || !(self.pending || self.unsaved) {
            return Ok(());
        }

        let contents = persist::encode(store)?;
        let mut result = self.file.write(&contents);

        if let Err(err) = &result {
            if err.class() == ErrorClass::Transient {
                log::warn!("{}, trying once more", err);
                result = self.file.write(&contents);
            }
        }

        match result {
            Ok(()) => {
                log::debug!("Flushed folder customizations to {}", self.file.describe());
                self.pending = false;
                self.unsaved = false;
                store.mark_clean();
                Ok(())
            }
            Err(err) => {
                if err.class() == ErrorClass::Fatal {
                    self.memory_only = true;
                }
                Err(err)
            }
        }
    }

    fn start_write(&mut self, store: &mut CustomizationStore) -> Option<SaveEvent> {
        let contents = match persist::encode(store) {
            Ok(contents) => contents,
            Err(err) => {
                log::error!("{}", err);
                self.pending = false;
                return Some(SaveEvent::Failed(err));
            }
        };

        let Some(sender) = &self.job_sender else {
            return Some(self.disable(PersistError::WriterGone));
        };

        if sender.send(contents).is_err() {
            return Some(self.disable(PersistError::WriterGone));
        }

        log::trace!("Queued save of {} folder(s)", store.len());
        self.pending = false;
        self.in_flight = true;
        store.mark_clean();
        None
    }

    fn handle_result(&mut self, result: Result<(), PersistError>) -> Option<SaveEvent> {
        let err = match result {
            Ok(()) => {
                log::debug!("Saved folder customizations to {}", self.file.describe());
                self.retried = false;
                self.unsaved = false;
                return Some(SaveEvent::Saved);
            }
            Err(err) => err,
        };

        match err.class() {
            ErrorClass::Transient if !self.retried => {
                log::warn!("{}, retrying", err);
                self.retried = true;
                self.pending = true;
                Some(SaveEvent::Retrying(err))
            }
            ErrorClass::Transient | ErrorClass::Data => {
                log::error!("{}", err);
                self.retried = false;
                self.unsaved = true;
                Some(SaveEvent::Failed(err))
            }
            ErrorClass::Fatal => Some(self.disable(err)),
        }
    }

    fn disable(&mut self, err: PersistError) -> SaveEvent {
        log::error!("{}; folder customizations will not be saved this session", err);
        self.memory_only = true;
        self.pending = false;
        SaveEvent::PersistenceDisabled(err)
    }
}

impl Drop for SaveScheduler {
    fn drop(&mut self) {
        // Closing the job channel ends the writer loop. The thread itself is
        // joined when `writer_thread` drops.
        self.job_sender = None;
    }
}
