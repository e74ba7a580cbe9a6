// Copyright 2024 TAKKT Industrial & Packaging GmbH
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
//
// SPDX-License-Identifier: Apache-2.0

use crate::consts::MINIMUM_PART_NUMBER;
use std::num::NonZeroU64;

/// A contiguous byte range of the source, uploaded as one part of a multipart upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Part {
    pub(crate) number: i32,
    pub(crate) offset: u64,
    pub(crate) size: u64,
}

impl Part {
    pub(crate) fn range(&self) -> std::ops::Range<usize> {
        let start = self.offset as usize;
        start..start + self.size as usize
    }
}

/// Splits `total_size` bytes into parts of `part_size` bytes, where only the last part may be
/// smaller.
///
/// Part numbers start at [`MINIMUM_PART_NUMBER`]. An empty source results in an empty plan.
///
/// The number of parts has to fit into an `i32`, which [`crate::config::Settings`] guarantees by
/// capping uploads at [`crate::consts::MAXIMUM_NUMBER_OF_PARTS`] parts.
pub(crate) fn plan(total_size: u64, part_size: NonZeroU64) -> Vec<Part> {
    let part_size = part_size.get();
    debug_assert!(
        total_size.div_ceil(part_size) <= i32::MAX as u64,
        "too many parts for {} bytes in parts of {} bytes",
        total_size,
        part_size,
    );
    let mut parts = Vec::with_capacity(total_size.div_ceil(part_size) as usize);

    let mut number = MINIMUM_PART_NUMBER;
    let mut offset = 0;
    while offset < total_size {
        let size = part_size.min(total_size - offset);
        parts.push(Part {
            number,
            offset,
            size,
        });
        offset += size;
        number += 1;
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::MiB;

    fn part_size(size: u64) -> NonZeroU64 {
        NonZeroU64::new(size).unwrap()
    }

    #[test]
    fn splits_into_full_parts_and_a_remainder() {
        let parts = plan(12 * MiB, part_size(5 * MiB));
        assert_eq!(
            parts,
            vec![
                Part {
                    number: 1,
                    offset: 0,
                    size: 5 * MiB,
                },
                Part {
                    number: 2,
                    offset: 5 * MiB,
                    size: 5 * MiB,
                },
                Part {
                    number: 3,
                    offset: 10 * MiB,
                    size: 2 * MiB,
                },
            ]
        );
    }

    #[test]
    fn exact_multiple_has_no_short_part() {
        let parts = plan(10 * MiB, part_size(5 * MiB));
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|part| part.size == 5 * MiB));
    }

    #[test]
    fn source_smaller_than_a_part_is_a_single_part() {
        let parts = plan(17, part_size(5 * MiB));
        assert_eq!(
            parts,
            vec![Part {
                number: 1,
                offset: 0,
                size: 17,
            }]
        );
    }

    #[test]
    fn empty_source_has_no_parts() {
        assert!(plan(0, part_size(1)).is_empty());
        assert!(plan(0, part_size(5 * MiB)).is_empty());
    }

    #[test]
    fn parts_cover_the_source_exactly_once() {
        for total_size in [1, 2, 3, 7, 64, 99, 100, 101, 1000] {
            for max_part_size in [1, 2, 3, 10, 64, 100, 2000] {
                let parts = plan(total_size, part_size(max_part_size));

                let mut expected_offset = 0;
                for (index, part) in parts.iter().enumerate() {
                    assert_eq!(part.number, index as i32 + 1);
                    assert_eq!(part.offset, expected_offset);
                    assert!(part.size >= 1);
                    assert!(part.size <= max_part_size);
                    expected_offset += part.size;
                }
                assert_eq!(
                    expected_offset, total_size,
                    "total {} with part size {}",
                    total_size, max_part_size,
                );
                assert_eq!(parts.len() as u64, total_size.div_ceil(max_part_size));
            }
        }
    }

    #[test]
    #[should_panic(expected = "too many parts")]
    #[cfg(debug_assertions)]
    fn part_count_must_fit_part_numbers() {
        plan(u64::MAX, part_size(1));
    }

    #[test]
    fn range_selects_the_part_bytes() {
        let data: Vec<u8> = (0..10).collect();
        let parts = plan(data.len() as u64, part_size(4));
        let chunks: Vec<&[u8]> = parts.iter().map(|part| &data[part.range()]).collect();
        let expected: Vec<&[u8]> = vec![&[0, 1, 2, 3], &[4, 5, 6, 7], &[8, 9]];
        assert_eq!(chunks, expected);
    }
}
