/*
 * Copyright 2020 UT OVERSEAS INC
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use crate::utils::types::Index;

/// Errors of the convenience layer. The primitives themselves have no runtime error path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AtomicsError {
    #[error("access of {len} bytes at offset {offset} exceeds capacity {capacity}")]
    OutOfBounds { offset: Index, len: Index, capacity: Index },
    #[error("offset {offset} is not aligned to {alignment} bytes")]
    Misaligned { offset: Index, alignment: Index },
    #[error("unknown memory ordering `{0}`")]
    UnknownOrdering(String),
    #[error("unknown atomics backend `{0}`")]
    UnknownBackend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = AtomicsError::OutOfBounds {
            offset: 12,
            len: 8,
            capacity: 16,
        };
        assert_eq!(err.to_string(), "access of 8 bytes at offset 12 exceeds capacity 16");
        assert_eq!(
            AtomicsError::UnknownOrdering("consume".to_string()).to_string(),
            "unknown memory ordering `consume`"
        );
    }
}
