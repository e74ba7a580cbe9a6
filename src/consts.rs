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

use std::time::Duration;

#[allow(non_upper_case_globals)]
pub(crate) const KiB: u64 = 1024;
#[allow(non_upper_case_globals)]
pub(crate) const MiB: u64 = 1024 * KiB;
#[allow(non_upper_case_globals)]
pub(crate) const GiB: u64 = 1024 * MiB;
#[allow(non_upper_case_globals)]
pub(crate) const TiB: u64 = 1024 * GiB;

/// Maximum object size: 5 TiB
///
/// Source: https://docs.aws.amazon.com/AmazonS3/latest/userguide/qfacts.html
pub(crate) const MAXIMUM_OBJECT_SIZE: u64 = 5 * TiB;

/// Maximum number of parts per upload: 10,000
///
/// Source: https://docs.aws.amazon.com/AmazonS3/latest/userguide/qfacts.html
pub(crate) const MAXIMUM_NUMBER_OF_PARTS: u64 = 10_000;

/// Part numbers: 1 to 10,000 (inclusive)
///
/// Source: https://docs.aws.amazon.com/AmazonS3/latest/userguide/qfacts.html
pub(crate) const MINIMUM_PART_NUMBER: i32 = 1;

/// Minimum part size: 5 MiB
///
/// There is no minimum size limit on the last part of your multipart upload.
///
/// Source: https://docs.aws.amazon.com/AmazonS3/latest/userguide/qfacts.html
pub(crate) const MINIMUM_PART_SIZE: u64 = 5 * MiB;

/// Maximum part size: 5 GiB
///
/// Source: https://docs.aws.amazon.com/AmazonS3/latest/userguide/qfacts.html
pub(crate) const MAXIMUM_PART_SIZE: u64 = 5 * GiB;

/// Part size used unless one is given explicitly, or the file would need more than
/// [`MAXIMUM_NUMBER_OF_PARTS`] parts of this size.
pub(crate) const DEFAULT_PART_SIZE: u64 = MINIMUM_PART_SIZE;

/// Number of attempts made for a single part before the whole upload is aborted.
pub(crate) const DEFAULT_MAX_RETRIES: u32 = 3;

/// Time after which a running upload is cancelled and aborted.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

pub(crate) const DEFAULT_REGION: &str = "us-east-1";

pub(crate) const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub(crate) const ACCESS_KEY_ID_ENV: &str = "XUPLOADERID";
pub(crate) const SECRET_ACCESS_KEY_ENV: &str = "XUPLOADERKEY";
pub(crate) const BUCKET_ENV: &str = "XUPLOADERDIRECTORY";
