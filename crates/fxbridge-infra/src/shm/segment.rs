// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::config::SegmentConfig;
use super::event_ring::EventChannel;
use super::frame_slot::FrameChannel;
use super::layout::{header, LayoutError, SegmentLayout, SEGMENT_MAGIC, SEGMENT_VERSION};
use super::region::Region;
use std::ffi::CString;
use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use thiserror::Error;

/// Longest accepted segment name, leading slash included.
const MAX_NAME_LEN: usize = 250;

/// A shared segment could not be created, opened or removed.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// The name is empty, too long, or contains `/` or NUL after the leading slash.
    #[error("invalid segment name {0:?}")]
    InvalidName(String),
    /// A segment with this name already exists.
    #[error("segment {0} already exists")]
    AlreadyExists(String),
    /// No segment with this name exists.
    #[error("segment {0} does not exist")]
    NotFound(String),
    /// The segment exists but its creator has not finished initializing it, or
    /// it has been retired.
    #[error("segment {0} is not initialized")]
    Uninitialized(String),
    /// The segment was created with an incompatible layout.
    #[error("segment {name} is incompatible: {reason}")]
    Incompatible {
        /// Segment name.
        name: String,
        /// What did not validate.
        reason: String,
    },
    /// The requested sizing cannot be laid out.
    #[error(transparent)]
    Layout(#[from] LayoutError),
    /// The operating system rejected the operation.
    #[error("shared memory operation on {name} failed: {source}")]
    Os {
        /// Segment name.
        name: String,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
}

/// Result of [`SharedSegment::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// A segment existed and was removed.
    Removed,
    /// Nothing by that name existed.
    Absent,
}

/// A named shared-memory region holding one frame channel and one event ring.
///
/// The renderer creates the segment; the host attaches to it. The creating
/// handle unlinks the name when dropped unless the segment was deleted in the
/// meantime. The mapping itself stays valid for every handle and channel until
/// the last of them is dropped.
pub struct SharedSegment {
    name: Option<String>,
    region: Arc<Region>,
    layout: SegmentLayout,
    owner: bool,
}

/// Normalizes `name` to a single leading slash and validates it.
pub fn normalize_name(name: &str) -> Result<String, SegmentError> {
    let bare = name.trim_start_matches('/');
    if bare.is_empty() || bare.contains('/') || bare.contains('\0') {
        return Err(SegmentError::InvalidName(name.to_owned()));
    }
    let normalized = format!("/{bare}");
    if normalized.len() > MAX_NAME_LEN {
        return Err(SegmentError::InvalidName(name.to_owned()));
    }
    Ok(normalized)
}

#[cfg(unix)]
fn c_name(name: &str) -> Result<CString, SegmentError> {
    CString::new(name).map_err(|_| SegmentError::InvalidName(name.to_owned()))
}

fn write_header(region: &Region, layout: &SegmentLayout) {
    region
        .atomic_u32(header::VERSION)
        .store(SEGMENT_VERSION, Ordering::Relaxed);
    region
        .atomic_u32(header::MAX_WIDTH)
        .store(layout.max_width, Ordering::Relaxed);
    region
        .atomic_u32(header::MAX_HEIGHT)
        .store(layout.max_height, Ordering::Relaxed);
    region
        .atomic_u32(header::EVENT_CAPACITY)
        .store(layout.event_capacity, Ordering::Relaxed);
    region.atomic_u32(header::SHUTDOWN).store(0, Ordering::Relaxed);
    region
        .atomic_u32(header::CREATOR_PID)
        .store(std::process::id(), Ordering::Relaxed);
    region
        .atomic_u64(header::EVENT_OFFSET)
        .store(layout.event_offset as u64, Ordering::Relaxed);
    region
        .atomic_u64(header::FRAME_OFFSET)
        .store(layout.frame_offset as u64, Ordering::Relaxed);
    region
        .atomic_u64(header::TOTAL_BYTES)
        .store(layout.total_bytes as u64, Ordering::Relaxed);
    EventChannel::initialize(region, layout);
    // Magic last: attachers treat its presence as "fully initialized".
    region
        .atomic_u32(header::MAGIC)
        .store(SEGMENT_MAGIC, Ordering::Release);
}

/// Validates an existing header and recovers its layout.
fn read_header(name: &str, region: &Region) -> Result<SegmentLayout, SegmentError> {
    let incompatible = |reason: String| SegmentError::Incompatible {
        name: name.to_owned(),
        reason,
    };

    if region.len() < header::BYTES {
        return Err(SegmentError::Uninitialized(name.to_owned()));
    }
    let magic = region.atomic_u32(header::MAGIC).load(Ordering::Acquire);
    if magic == 0 {
        return Err(SegmentError::Uninitialized(name.to_owned()));
    }
    if magic != SEGMENT_MAGIC {
        return Err(incompatible(format!("bad magic {magic:#010x}")));
    }
    let version = region.atomic_u32(header::VERSION).load(Ordering::Relaxed);
    if version != SEGMENT_VERSION {
        return Err(incompatible(format!("unsupported version {version}")));
    }

    let config = SegmentConfig {
        max_width: region.atomic_u32(header::MAX_WIDTH).load(Ordering::Relaxed),
        max_height: region.atomic_u32(header::MAX_HEIGHT).load(Ordering::Relaxed),
        event_capacity: region
            .atomic_u32(header::EVENT_CAPACITY)
            .load(Ordering::Relaxed),
    };
    let layout = SegmentLayout::new(&config).map_err(|e| incompatible(e.to_string()))?;

    let recorded = (
        region.atomic_u64(header::EVENT_OFFSET).load(Ordering::Relaxed),
        region.atomic_u64(header::FRAME_OFFSET).load(Ordering::Relaxed),
        region.atomic_u64(header::TOTAL_BYTES).load(Ordering::Relaxed),
    );
    let computed = (
        layout.event_offset as u64,
        layout.frame_offset as u64,
        layout.total_bytes as u64,
    );
    if recorded != computed {
        return Err(incompatible(format!(
            "recorded offsets {recorded:?} do not match {computed:?}"
        )));
    }
    if region.len() < layout.total_bytes {
        return Err(incompatible(format!(
            "mapping holds {} bytes, layout needs {}",
            region.len(),
            layout.total_bytes
        )));
    }
    Ok(layout)
}

/// The pid of the running process that created `name`, if there is one.
#[cfg(unix)]
fn live_creator(name: &str) -> Result<Option<u32>, SegmentError> {
    use super::posix;

    let os_err = |source| SegmentError::Os {
        name: name.to_owned(),
        source,
    };
    let file = match posix::open_existing(&c_name(name)?) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(os_err(e)),
    };
    if (file.metadata().map_err(os_err)?.len() as usize) < header::BYTES {
        return Ok(None);
    }

    // SAFETY: only the header, which the object is large enough to hold.
    let map = unsafe { memmap2::MmapOptions::new().len(header::BYTES).map_mut(&file) }
        .map_err(os_err)?;
    let region = Region::mapped(map);
    if region.atomic_u32(header::MAGIC).load(Ordering::Acquire) != SEGMENT_MAGIC {
        return Ok(None);
    }
    let pid = region
        .atomic_u32(header::CREATOR_PID)
        .load(Ordering::Relaxed);
    Ok(posix::process_alive(pid).then_some(pid))
}

impl SharedSegment {
    /// Creates and initializes a new named segment.
    ///
    /// Fails with [`SegmentError::AlreadyExists`] if the name is taken.
    #[cfg(unix)]
    pub fn create(name: &str, config: &SegmentConfig) -> Result<Self, SegmentError> {
        use super::posix;

        let name = normalize_name(name)?;
        let layout = SegmentLayout::new(config)?;
        let c_name = c_name(&name)?;

        let file = posix::create(&c_name, layout.total_bytes as u64).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                SegmentError::AlreadyExists(name.clone())
            } else {
                SegmentError::Os {
                    name: name.clone(),
                    source: e,
                }
            }
        })?;

        // SAFETY: the object was just created with O_EXCL and sized to the layout.
        let map = unsafe { memmap2::MmapOptions::new().len(layout.total_bytes).map_mut(&file) };
        let map = match map {
            Ok(map) => map,
            Err(e) => {
                let _ = posix::unlink(&c_name);
                return Err(SegmentError::Os { name, source: e });
            }
        };

        let region = Region::mapped(map);
        write_header(&region, &layout);
        log::info!(
            "Created shared segment {name} ({} bytes, max frame {}x{}, {} event slots)",
            layout.total_bytes,
            layout.max_width,
            layout.max_height,
            layout.event_capacity
        );

        Ok(Self {
            name: Some(name),
            region: Arc::new(region),
            layout,
            owner: true,
        })
    }

    /// Creates the segment, first removing a stale one left behind by a
    /// renderer that is no longer running.
    ///
    /// A segment whose creator is still alive is left alone and the call fails
    /// with [`SegmentError::AlreadyExists`]. A segment that never finished
    /// initializing counts as stale.
    #[cfg(unix)]
    pub fn create_or_replace(name: &str, config: &SegmentConfig) -> Result<Self, SegmentError> {
        match Self::create(name, config) {
            Err(SegmentError::AlreadyExists(existing)) => {
                if let Some(pid) = live_creator(&existing)? {
                    log::error!("Shared segment {existing} is in use by process {pid}");
                    return Err(SegmentError::AlreadyExists(existing));
                }
                if Self::delete(&existing)? == DeleteOutcome::Removed {
                    log::warn!("Replaced a stale shared segment named {existing}");
                }
                Self::create(&existing, config)
            }
            result => result,
        }
    }

    /// Attaches to an existing segment (host side).
    #[cfg(unix)]
    pub fn attach(name: &str) -> Result<Self, SegmentError> {
        use super::posix;

        let name = normalize_name(name)?;
        let c_name = c_name(&name)?;

        let file = posix::open_existing(&c_name).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                SegmentError::NotFound(name.clone())
            } else {
                SegmentError::Os {
                    name: name.clone(),
                    source: e,
                }
            }
        })?;
        let os_err = |source| SegmentError::Os {
            name: name.clone(),
            source,
        };
        let len = file.metadata().map_err(os_err)?.len() as usize;
        if len < header::BYTES {
            return Err(SegmentError::Uninitialized(name));
        }

        // SAFETY: the mapping covers exactly the object's current length.
        let map = unsafe { memmap2::MmapOptions::new().len(len).map_mut(&file) }.map_err(os_err)?;
        let region = Region::mapped(map);
        let layout = read_header(&name, &region)?;
        log::info!("Attached to shared segment {name}");

        Ok(Self {
            name: Some(name),
            region: Arc::new(region),
            layout,
            owner: false,
        })
    }

    /// Removes the named segment.
    ///
    /// The segment is retired first, so a renderer still holding it sees its
    /// frame channel closed. Removing a name that does not exist succeeds with
    /// [`DeleteOutcome::Absent`].
    #[cfg(unix)]
    pub fn delete(name: &str) -> Result<DeleteOutcome, SegmentError> {
        use super::posix;

        let name = normalize_name(name)?;
        let c_name = c_name(&name)?;

        match posix::open_existing(&c_name) {
            Ok(file) => {
                let retired = file
                    .metadata()
                    .ok()
                    .filter(|meta| meta.len() as usize >= header::BYTES)
                    // SAFETY: only the header, which the object is large enough to hold.
                    .and_then(|_| unsafe {
                        memmap2::MmapOptions::new()
                            .len(header::BYTES)
                            .map_mut(&file)
                            .ok()
                    })
                    .map(|map| {
                        Region::mapped(map)
                            .atomic_u32(header::MAGIC)
                            .store(0, Ordering::Release);
                    })
                    .is_some();
                if !retired {
                    log::debug!("Could not retire {name} before unlinking");
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("Shared segment {name} does not exist; nothing to delete");
                return Ok(DeleteOutcome::Absent);
            }
            Err(e) => log::debug!("Could not open {name} before unlinking: {e}"),
        }

        match posix::unlink(&c_name) {
            Ok(()) => {
                log::info!("Deleted shared segment {name}");
                Ok(DeleteOutcome::Removed)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(DeleteOutcome::Absent),
            Err(e) => Err(SegmentError::Os { name, source: e }),
        }
    }

    /// Creates an unnamed, process-local segment with the same layout.
    ///
    /// Used by tests and by hosts embedding the renderer in-process.
    pub fn in_memory(config: &SegmentConfig) -> Result<Self, SegmentError> {
        let layout = SegmentLayout::new(config)?;
        let region = Region::heap(layout.total_bytes);
        write_header(&region, &layout);
        Ok(Self {
            name: None,
            region: Arc::new(region),
            layout,
            owner: true,
        })
    }

    /// The normalized name, or `None` for in-memory segments.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The resolved layout.
    pub fn layout(&self) -> &SegmentLayout {
        &self.layout
    }

    /// Whether the segment has been deleted or retired.
    pub fn is_retired(&self) -> bool {
        self.region.atomic_u32(header::MAGIC).load(Ordering::Acquire) != SEGMENT_MAGIC
    }

    /// A handle on the event ring.
    pub fn event_channel(&self) -> EventChannel {
        EventChannel::new(Arc::clone(&self.region), &self.layout)
    }

    /// A handle on the frame area.
    pub fn frame_channel(&self) -> FrameChannel {
        FrameChannel::new(Arc::clone(&self.region), self.layout)
    }

    /// Asks the renderer to stop (host side).
    pub fn request_shutdown(&self) {
        self.region
            .atomic_u32(header::SHUTDOWN)
            .store(1, Ordering::Release);
    }

    /// Whether a shutdown has been requested.
    pub fn shutdown_requested(&self) -> bool {
        self.region.atomic_u32(header::SHUTDOWN).load(Ordering::Acquire) != 0
    }

    /// Process id recorded by the creator.
    pub fn creator_pid(&self) -> u32 {
        self.region
            .atomic_u32(header::CREATOR_PID)
            .load(Ordering::Relaxed)
    }
}

impl SharedSegment {
    #[cfg(unix)]
    fn unlink_owned(&self, name: &str) {
        if self.is_retired() {
            log::debug!("Shared segment {name} was already deleted");
            return;
        }
        self.region
            .atomic_u32(header::MAGIC)
            .store(0, Ordering::Release);
        let result = c_name(name).and_then(|c_name| {
            super::posix::unlink(&c_name).map_err(|source| SegmentError::Os {
                name: name.to_owned(),
                source,
            })
        });
        match result {
            Ok(()) => log::info!("Unlinked shared segment {name}"),
            Err(e) => log::warn!("Failed to unlink shared segment {name}: {e}"),
        }
    }

    #[cfg(not(unix))]
    fn unlink_owned(&self, _name: &str) {}
}

impl Drop for SharedSegment {
    fn drop(&mut self) {
        if let (true, Some(name)) = (self.owner, self.name.as_deref()) {
            self.unlink_owned(name);
        }
    }
}

impl std::fmt::Debug for SharedSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSegment")
            .field("name", &self.name)
            .field("layout", &self.layout)
            .field("owner", &self.owner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SegmentConfig {
        SegmentConfig {
            max_width: 8,
            max_height: 8,
            event_capacity: 4,
        }
    }

    #[test]
    fn names_get_one_leading_slash() {
        assert_eq!(normalize_name("view").unwrap(), "/view");
        assert_eq!(normalize_name("/view").unwrap(), "/view");
        assert_eq!(normalize_name("//view").unwrap(), "/view");
    }

    #[test]
    fn bad_names_are_rejected() {
        for name in ["", "/", "a/b", "nul\0byte"] {
            assert!(
                matches!(normalize_name(name), Err(SegmentError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
        let long = "x".repeat(MAX_NAME_LEN);
        assert!(normalize_name(&long).is_err());
        assert!(normalize_name(&long[1..]).is_ok());
    }

    #[test]
    fn in_memory_segment_has_a_valid_header() {
        let segment = SharedSegment::in_memory(&small()).unwrap();
        assert_eq!(segment.name(), None);
        assert!(!segment.is_retired());
        assert_eq!(read_header("mem", &segment.region).unwrap(), *segment.layout());
    }

    #[test]
    fn shutdown_word_is_shared_with_channels() {
        let segment = SharedSegment::in_memory(&small()).unwrap();
        let events = segment.event_channel();
        assert!(!events.shutdown_requested());
        segment.request_shutdown();
        assert!(segment.shutdown_requested());
        assert!(events.shutdown_requested());
    }

    #[test]
    fn header_with_wrong_version_is_incompatible() {
        let segment = SharedSegment::in_memory(&small()).unwrap();
        segment
            .region
            .atomic_u32(header::VERSION)
            .store(7, Ordering::Relaxed);
        assert!(matches!(
            read_header("mem", &segment.region),
            Err(SegmentError::Incompatible { .. })
        ));
    }

    #[test]
    fn zero_magic_reads_as_uninitialized() {
        let segment = SharedSegment::in_memory(&small()).unwrap();
        segment
            .region
            .atomic_u32(header::MAGIC)
            .store(0, Ordering::Relaxed);
        assert!(segment.is_retired());
        assert!(matches!(
            read_header("mem", &segment.region),
            Err(SegmentError::Uninitialized(_))
        ));
    }

    #[test]
    fn header_records_the_creating_process() {
        let segment = SharedSegment::in_memory(&small()).unwrap();
        assert_eq!(segment.creator_pid(), std::process::id());
    }

    #[cfg(unix)]
    fn exited_pid() -> u32 {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        pid
    }

    #[cfg(unix)]
    #[test]
    fn segment_of_an_exited_creator_is_replaced() {
        let name = format!("/fxb-unit-{}-stale", std::process::id());
        let _ = SharedSegment::delete(&name);

        let abandoned = SharedSegment::create(&name, &small()).unwrap();
        abandoned
            .region
            .atomic_u32(header::CREATOR_PID)
            .store(exited_pid(), Ordering::Relaxed);
        assert_eq!(live_creator(&name).unwrap(), None);

        let fresh = SharedSegment::create_or_replace(&name, &small()).unwrap();
        assert!(abandoned.is_retired());
        assert!(!fresh.is_retired());
        assert_eq!(fresh.creator_pid(), std::process::id());

        drop(abandoned);
        assert!(SharedSegment::attach(&name).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn segment_of_a_running_creator_is_kept() {
        let name = format!("/fxb-unit-{}-live", std::process::id());
        let _ = SharedSegment::delete(&name);

        let running = SharedSegment::create(&name, &small()).unwrap();
        assert_eq!(live_creator(&name).unwrap(), Some(std::process::id()));
        assert!(matches!(
            SharedSegment::create_or_replace(&name, &small()),
            Err(SegmentError::AlreadyExists(_))
        ));
        assert!(!running.is_retired());
    }
}
