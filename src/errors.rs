// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The one error type shared by every stage of a render: reading the
//! parameters, running the workers and the coordinator, and writing
//! the image at the end.

use failure::Fail;
use std::io;
use std::time::Duration;

/// Everything that can go wrong between reading a parameter file and
/// writing the finished image.
#[derive(Debug, Fail)]
pub enum RenderError {
    /// The parameter file could not be read.
    #[fail(display = "Can't open file {}: {}", path, cause)]
    ParamsIo {
        /// The file we tried to read.
        path: String,
        /// Why it could not be read.
        #[cause]
        cause: io::Error,
    },

    /// A parameter line that isn't a `key = value` pair.
    #[fail(display = "line {}: expected `key = value`, found {:?}", line, text)]
    Malformed {
        /// One-based line number.
        line: usize,
        /// The offending text.
        text: String,
    },

    /// A parameter key we don't know about.
    #[fail(display = "line {}: unknown configuration directive {}", line, key)]
    UnknownKey {
        /// One-based line number.
        line: usize,
        /// The key as written.
        key: String,
    },

    /// A parameter value that doesn't parse as a number.
    #[fail(display = "line {}: {} is not a number: {:?}", line, key, value)]
    BadNumber {
        /// One-based line number.
        line: usize,
        /// The key whose value was bad.
        key: String,
        /// The value as written.
        value: String,
    },

    /// A required parameter was never given.
    #[fail(display = "No {} value specified", _0)]
    MissingField(&'static str),

    /// A parameter was given, but its value is unusable.
    #[fail(display = "{} must be {}", field, expected)]
    InvalidValue {
        /// The parameter name.
        field: &'static str,
        /// What would have been acceptable.
        expected: &'static str,
    },

    /// Neither the parameters nor the display could say how big the
    /// image should be.
    #[fail(display = "Image dimensions not specified and the display has no default")]
    NoDimensions,

    /// A render was asked for with zero workers.
    #[fail(display = "At least one worker is required")]
    NoWorkers,

    /// The operating system refused to start a worker thread.
    #[fail(display = "Could not start worker {}: {}", worker, cause)]
    Spawn {
        /// The worker that failed to start.
        worker: usize,
        /// The underlying failure.
        #[cause]
        cause: io::Error,
    },

    /// A worker found the coordinator's end of its channel closed.
    #[fail(display = "Worker {} lost its coordinator", _0)]
    CoordinatorGone(usize),

    /// Every worker hung up before all of them reported completion.
    #[fail(display = "All {} workers hung up before completing", _0)]
    WorkersGone(usize),

    /// No slot became ready within the configured stall timeout.
    #[fail(display = "No slot became ready within {:?}", _0)]
    Stalled(Duration),

    /// The image could not be written or read back.
    #[fail(display = "Could not encode {}: {}", path, reason)]
    Encode {
        /// The image path.
        path: String,
        /// What the encoder said.
        reason: String,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RenderError>;
