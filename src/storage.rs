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
use bytes::Bytes;
use serde::Serialize;

/// An open multipart upload on the storage service.
///
/// Only [`crate::upload::Orchestrator`] holds one, and it hands it over by value when completing
/// or aborting the upload, so that a transaction is never terminated twice.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct UploadTransaction {
    pub(crate) upload_id: String,
    pub(crate) bucket: String,
    pub(crate) key: String,
    pub(crate) content_type: String,
}

/// Proof that a part was stored, as returned by the storage service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct CompletedPart {
    pub(crate) part_number: i32,
    pub(crate) e_tag: String,
}

/// The completed parts of an upload, ordered by part number without gaps.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub(crate) struct CompletedManifest {
    parts: Vec<CompletedPart>,
}

impl CompletedManifest {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            parts: Vec::with_capacity(capacity),
        }
    }

    /// Appends the next part. Parts have to be pushed in ascending order, starting at
    /// [`MINIMUM_PART_NUMBER`].
    pub(crate) fn push(&mut self, part: CompletedPart) {
        debug_assert_eq!(
            part.part_number,
            MINIMUM_PART_NUMBER + self.parts.len() as i32,
            "parts must be added to the manifest in order",
        );
        self.parts.push(part);
    }

    pub(crate) fn parts(&self) -> &[CompletedPart] {
        &self.parts
    }

    pub(crate) fn len(&self) -> usize {
        self.parts.len()
    }
}

/// What the storage service reports after assembling the object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub(crate) struct FinalizedObject {
    pub(crate) location: Option<String>,
    pub(crate) e_tag: Option<String>,
}

/// The requests of the multipart upload protocol.
///
/// Every failure is a transport error: the request either didn't reach the service, or the
/// service answered with something other than success.
pub(crate) trait StorageClient {
    async fn open_transaction(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> anyhow::Result<UploadTransaction>;

    /// Uploads the body of a single part and returns its ETag.
    async fn upload_part(
        &self,
        transaction: &UploadTransaction,
        part_number: i32,
        body: Bytes,
    ) -> anyhow::Result<String>;

    async fn abort_transaction(&self, transaction: &UploadTransaction) -> anyhow::Result<()>;

    async fn finalize_transaction(
        &self,
        transaction: &UploadTransaction,
        manifest: &CompletedManifest,
    ) -> anyhow::Result<FinalizedObject>;
}
