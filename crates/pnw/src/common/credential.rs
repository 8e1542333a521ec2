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

//! API key storage for Politics and War requests.

use core::fmt::Debug;

use zeroize::ZeroizeOnDrop;

use super::consts::PNW_API_KEY_ENV;

/// API key used by both the GraphQL endpoint and the subscription control plane.
///
/// The key travels as a query/body parameter rather than a signed header, so the only
/// thing worth protecting is that it never shows up in logs.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Credential {
    api_key: Box<str>,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(Credential))
            .field("api_key", &self.masked_api_key())
            .finish()
    }
}

impl Credential {
    /// Creates a new [`Credential`] instance from the API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into().into_boxed_str(),
        }
    }

    /// Resolves a credential from `api_key`, falling back to the `PNW_API_KEY`
    /// environment variable.
    ///
    /// Returns `None` when neither is set or the resolved key is empty.
    #[must_use]
    pub fn resolve(api_key: Option<String>) -> Option<Self> {
        api_key
            .or_else(|| std::env::var(PNW_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
            .map(Self::new)
    }

    /// Returns the API key associated with this credential.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns a masked version of the API key for logging purposes.
    ///
    /// Shows first 4 and last 4 characters with ellipsis in between.
    /// For keys shorter than 8 characters, shows asterisks only.
    #[must_use]
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        let len = chars.len();

        if len <= 8 {
            "*".repeat(len)
        } else {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[len - 4..].iter().collect();
            format!("{head}...{tail}")
        }
    }
}
