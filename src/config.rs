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

use crate::{
    consts::{
        DEFAULT_PART_SIZE,
        MAXIMUM_NUMBER_OF_PARTS,
        MAXIMUM_OBJECT_SIZE,
        MAXIMUM_PART_SIZE,
        MINIMUM_PART_SIZE,
    },
    result::{
        bail,
        AnyhowResultExt,
        Result,
    },
};
use std::{
    fmt::{
        Debug,
        Formatter,
    },
    num::NonZeroU64,
};

/// Static credentials for the storage service and the bucket to upload into.
#[derive(Clone)]
pub(crate) struct Credentials {
    pub(crate) access_key_id: String,
    pub(crate) secret_access_key: String,
    pub(crate) bucket: String,
}

impl Credentials {
    /// Validates that none of the values are empty.
    pub(crate) fn new(
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        bucket: Option<String>,
    ) -> Result<Self> {
        fn required(value: Option<String>, name: &str) -> Result<String> {
            match value.map(|value| value.trim().to_owned()) {
                Some(value) if !value.is_empty() => Ok(value),
                _ => bail!("{} is missing or empty", name),
            }
        }

        Ok(Self {
            access_key_id: required(access_key_id, "The access key ID")?,
            secret_access_key: required(secret_access_key, "The secret access key")?,
            bucket: required(bucket, "The bucket name")?,
        })
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("bucket", &self.bucket)
            .finish()
    }
}

/// How a file is uploaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) bucket: String,
    pub(crate) part_size: NonZeroU64,
    /// Attempts made per part before the upload is aborted.
    pub(crate) max_retries: u32,
}

impl Settings {
    /// Picks and validates the settings to upload a file of `file_size_in_bytes`.
    pub(crate) fn for_file(
        bucket: String,
        file_size_in_bytes: u64,
        override_part_size: Option<u64>,
        max_retries: u32,
    ) -> Result<Self> {
        if file_size_in_bytes > MAXIMUM_OBJECT_SIZE {
            return Err(anyhow::anyhow!(
                "File exceeds the maximum object size of S3 and thus can't be uploaded"
            ))
            .into_source();
        }
        if max_retries == 0 {
            bail!("At least one attempt per part is required");
        }

        let part_size = if let Some(override_part_size) = override_part_size {
            if override_part_size < MINIMUM_PART_SIZE {
                bail!(
                    "The part size is too small, it must be at least {} bytes",
                    MINIMUM_PART_SIZE
                );
            } else if override_part_size > MAXIMUM_PART_SIZE {
                bail!(
                    "The part size is too large, it must be at most {} bytes",
                    MAXIMUM_PART_SIZE
                );
            }
            if file_size_in_bytes.div_ceil(override_part_size) > MAXIMUM_NUMBER_OF_PARTS {
                bail!("The number of parts exceeds the maximum number of parts allowed by S3");
            }
            override_part_size
        } else {
            // Files that would need more than `MAXIMUM_NUMBER_OF_PARTS` parts of the default size
            // are split into fewer, larger parts.
            let part_size =
                DEFAULT_PART_SIZE.max(file_size_in_bytes.div_ceil(MAXIMUM_NUMBER_OF_PARTS));
            if part_size > MAXIMUM_PART_SIZE {
                bail!("The part size exceeds the maximum part size allowed by S3");
            }
            part_size
        };

        Ok(Self {
            bucket,
            part_size: NonZeroU64::new(part_size)
                .ok_or_else(|| anyhow::anyhow!("The part size must not be zero"))
                .into_config()?,
            max_retries,
        })
    }
}
