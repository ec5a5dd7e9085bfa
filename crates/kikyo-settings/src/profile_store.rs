use crate::error::{Error, Result};
use crate::gateway::BackendGateway;
use crate::memory::DerivedFieldMemory;
use crate::profile::{
    percent_to_ratio, ratio_to_percent, ImeMode, Profile, SinglePress, SuspendKey, ThumbKeySelect,
    ThumbSide,
};
use crate::status::StatusLine;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// A single form edit: the field it addresses together with its new value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldEdit {
    ThumbKey(ThumbSide, ThumbKeySelect),
    ThumbContinuous(ThumbSide, bool),
    ThumbSinglePress(ThumbSide, SinglePress),
    ThumbRepeat(ThumbSide, bool),
    CharRepeatAssigned(bool),
    CharRepeatUnassigned(bool),
    CharContinuous(bool),
    /// Edited as a whole percentage, stored as a ratio.
    CharOverlapPercent(u32),
    ThumbShiftOverlapPercent(u32),
    ImeMode(ImeMode),
    SuspendKey(SuspendKey),
}

/// How the repeat checkbox of a thumb side should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatControl {
    pub checked: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The backend accepted this document.
    Applied,
    /// A newer save was issued before this one failed; its result is moot.
    Superseded,
}

enum Settle {
    Done(Result<SaveOutcome>),
    Resend,
}

struct ProfileState {
    profile: Profile,
    memory: DerivedFieldMemory<ThumbSide>,
    loaded: bool,
    // save sequencing, see `ProfileStore::save`
    issued: u64,
    landed: u64,
}

impl ProfileState {
    fn live_repeat(&self, side: ThumbSide) -> bool {
        self.memory
            .get(side)
            .unwrap_or_else(|| self.profile.thumb(side).repeat)
    }

    fn derive_repeat(&mut self, side: ThumbSide) {
        let guard = self.profile.thumb(side).single_press.allows_repeat();
        let live = self.live_repeat(side);
        let effective = self.memory.reconcile(side, guard, live);
        self.profile.thumb_mut(side).repeat = effective;
    }

    fn payload(&mut self) -> Profile {
        for side in ThumbSide::ALL {
            self.derive_repeat(side);
        }
        self.profile.clone()
    }

    fn settle(&mut self, seq: u64, result: Result<()>) -> Settle {
        match result {
            Ok(()) if seq > self.landed => {
                self.landed = seq;
                Settle::Done(Ok(SaveOutcome::Applied))
            }
            // An older document landed after a newer one.
            Ok(()) => Settle::Resend,
            Err(_) if seq < self.issued => Settle::Done(Ok(SaveOutcome::Superseded)),
            Err(e) => Settle::Done(Err(e)),
        }
    }
}

/// In-memory profile document mirrored to the backend.
pub struct ProfileStore {
    gateway: BackendGateway,
    status: StatusLine,
    state: Mutex<ProfileState>,
}

impl ProfileStore {
    pub fn new(gateway: BackendGateway, status: StatusLine) -> Self {
        Self {
            gateway,
            status,
            state: Mutex::new(ProfileState {
                profile: Profile::default(),
                memory: DerivedFieldMemory::new(),
                loaded: false,
                issued: 0,
                landed: 0,
            }),
        }
    }

    /// Fetches the profile and replaces the in-memory document.
    ///
    /// Repeat memory is seeded from the fetched document for sides the user
    /// has not touched yet; remembered choices survive a reload.
    pub async fn load(&self) -> Result<Profile> {
        let profile = match self.gateway.get_profile().await {
            Ok(profile) => profile,
            Err(e) => {
                self.status.set(format!("Failed to load settings: {e}"));
                return Err(e);
            }
        };

        let mut st = self.state.lock();
        for side in ThumbSide::ALL {
            if st.memory.seed(side, profile.thumb(side).repeat) {
                debug!("seeded repeat memory for {}", side);
            }
        }
        st.profile = profile.clone();
        st.loaded = true;
        info!("Profile loaded");
        Ok(profile)
    }

    /// Applies one edit to the in-memory document. Does not persist.
    pub fn mutate(&self, edit: FieldEdit) -> Result<()> {
        let mut st = self.state.lock();
        match edit {
            FieldEdit::ThumbKey(side, key) => st.profile.thumb_mut(side).key = key,
            FieldEdit::ThumbContinuous(side, on) => st.profile.thumb_mut(side).continuous = on,
            FieldEdit::ThumbSinglePress(side, mode) => {
                st.profile.thumb_mut(side).single_press = mode;
                st.derive_repeat(side);
            }
            FieldEdit::ThumbRepeat(side, on) => {
                if st.profile.thumb(side).single_press.allows_repeat() {
                    st.memory.set(side, on);
                    st.profile.thumb_mut(side).repeat = on;
                } else {
                    debug!("repeat edit for {} ignored while suppressed", side);
                }
            }
            FieldEdit::CharRepeatAssigned(on) => st.profile.char_key_repeat_assigned = on,
            FieldEdit::CharRepeatUnassigned(on) => st.profile.char_key_repeat_unassigned = on,
            FieldEdit::CharContinuous(on) => st.profile.char_key_continuous = on,
            FieldEdit::CharOverlapPercent(p) => {
                st.profile.char_key_overlap_ratio = checked_ratio(p)?;
            }
            FieldEdit::ThumbShiftOverlapPercent(p) => {
                st.profile.thumb_shift_overlap_ratio = checked_ratio(p)?;
            }
            FieldEdit::ImeMode(mode) => st.profile.ime_mode = mode,
            FieldEdit::SuspendKey(key) => st.profile.suspend_key = key,
        }
        Ok(())
    }

    /// Sends the whole document to the backend.
    ///
    /// Saves are neither debounced nor serialized; several may be in flight.
    /// The most recently issued save wins: each call is numbered, a failure
    /// of a call that has since been superseded is dropped, and if an older
    /// document lands after a newer one the current document is sent again.
    /// The in-memory document is never rolled back on failure.
    pub async fn save(&self) -> Result<SaveOutcome> {
        loop {
            let (seq, payload) = {
                let mut st = self.state.lock();
                st.issued += 1;
                (st.issued, st.payload())
            };

            let result = self.gateway.set_profile(&payload).await;

            let settled = self.state.lock().settle(seq, result);
            match settled {
                Settle::Done(Ok(outcome)) => {
                    debug!("save #{} settled: {:?}", seq, outcome);
                    return Ok(outcome);
                }
                Settle::Done(Err(e)) => {
                    self.status.set(format!("Failed to save settings: {e}"));
                    return Err(e);
                }
                Settle::Resend => {
                    warn!("save #{} landed after a newer save; resending", seq);
                }
            }
        }
    }

    /// Mutates and immediately saves.
    pub async fn edit(&self, edit: FieldEdit) -> Result<SaveOutcome> {
        self.mutate(edit)?;
        self.save().await
    }

    pub fn profile(&self) -> Profile {
        self.state.lock().profile.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.lock().loaded
    }

    pub fn repeat_control(&self, side: ThumbSide) -> RepeatControl {
        let st = self.state.lock();
        if st.profile.thumb(side).single_press.allows_repeat() {
            RepeatControl {
                checked: st.live_repeat(side),
                enabled: true,
            }
        } else {
            RepeatControl {
                checked: false,
                enabled: false,
            }
        }
    }

    pub fn char_overlap_percent(&self) -> u8 {
        ratio_to_percent(self.state.lock().profile.char_key_overlap_ratio)
    }

    pub fn thumb_shift_overlap_percent(&self) -> u8 {
        ratio_to_percent(self.state.lock().profile.thumb_shift_overlap_ratio)
    }
}

fn checked_ratio(percent: u32) -> Result<f64> {
    u8::try_from(percent)
        .ok()
        .filter(|p| *p <= 100)
        .map(percent_to_ratio)
        .ok_or(Error::InvalidPercent(percent))
}
