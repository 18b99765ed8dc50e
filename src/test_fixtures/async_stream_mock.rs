/*
 *   Copyright (c) 2024 R3BL LLC
 *   All rights reserved.
 *
 *   Licensed under the Apache License, Version 2.0 (the "License");
 *   you may not use this file except in compliance with the License.
 *   You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 *   Unless required by applicable law or agreed to in writing, software
 *   distributed under the License is distributed on an "AS IS" BASIS,
 *   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *   See the License for the specific language governing permissions and
 *   limitations under the License.
 */

use std::time::Duration;

use crate::PinnedInputStream;

/// Turn a [Vec] of items into an async stream, yielding them one by one.
pub fn gen_input_stream<T: Send + Sync + 'static>(items: Vec<T>) -> PinnedInputStream<T> {
    let stream = async_stream::stream! {
        for item in items {
            yield item;
        }
    };
    Box::pin(stream)
}

/// Like [gen_input_stream], with an artificial delay before each item. Useful for tests
/// that need interleaving with other tasks.
pub fn gen_input_stream_with_delay<T: Send + Sync + 'static>(
    items: Vec<T>,
    delay: Duration,
) -> PinnedInputStream<T> {
    let stream = async_stream::stream! {
        for item in items {
            tokio::time::sleep(delay).await;
            yield item;
        }
    };
    Box::pin(stream)
}
