// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Tracking of dynamically spawned tasks (callbacks and re-subscribes) for orderly shutdown.

use std::{sync::Mutex, time::Duration};

use futures_util::future::join_all;
use tokio::task::JoinHandle;

use crate::common::consts::MUTEX_POISONED;

/// A set of running background tasks.
///
/// Finished handles are pruned on every spawn, so the set only grows with the number of
/// tasks actually in flight.
#[derive(Debug, Default)]
pub struct TaskSet {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `fut` and tracks its handle.
    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(fut);

        let mut tasks = self.handles.lock().expect(MUTEX_POISONED);
        tasks.retain(|handle| !handle.is_finished());
        tasks.push(handle);
    }

    /// Returns the number of tasks still running.
    #[must_use]
    pub fn len(&self) -> usize {
        let tasks = self.handles.lock().expect(MUTEX_POISONED);
        tasks.iter().filter(|handle| !handle.is_finished()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits up to `grace` for every tracked task, then aborts the stragglers.
    ///
    /// Returns the number of tasks that had to be aborted.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self.handles.lock().expect(MUTEX_POISONED);
            tasks.drain(..).collect()
        };

        if handles.is_empty() {
            return 0;
        }

        let abort_handles: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
        tracing::debug!("Awaiting {} background tasks", handles.len());

        if tokio::time::timeout(grace, join_all(handles)).await.is_ok() {
            return 0;
        }

        let stragglers = abort_handles
            .iter()
            .filter(|handle| !handle.is_finished())
            .inspect(|handle| handle.abort())
            .count();

        tracing::warn!("Aborted {stragglers} background tasks after {grace:?} grace period");
        stragglers
    }
}
