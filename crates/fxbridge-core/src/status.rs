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

//! Process exit status flags shared by the renderer and its launchers.

use bitflags::bitflags;

bitflags! {
    /// Exit status bits. Callers test them bitwise.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExitStatus: u8 {
        /// Something went wrong.
        const ERROR = 1 << 0;
        /// The command line could not be used.
        const ARGS_ERROR = 1 << 1;
        /// The shared segment could not be created or removed.
        const ALLOCATION_ERROR = 1 << 2;
        /// The render loop failed after startup.
        const RUNTIME_ERROR = 1 << 3;
    }
}

impl ExitStatus {
    /// No bits set.
    pub const SUCCESS: Self = Self::empty();

    /// The numeric process exit code.
    pub fn code(self) -> u8 {
        self.bits()
    }

    /// Whether no error bit is set.
    pub fn is_success(self) -> bool {
        self.is_empty()
    }
}
