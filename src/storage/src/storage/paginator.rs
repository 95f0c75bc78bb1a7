// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::Result;
use crate::model::ListResponse;
use futures::stream::unfold;
use futures::{Stream, StreamExt};
use pin_project::pin_project;
use std::future::Future;
use std::pin::Pin;

/// A single page of results from a list operation.
///
/// There are no more pages when
/// [next_page_token()][Page::next_page_token] returns `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    items: Vec<T>,
    next_page_token: Option<String>,
    prefixes: Vec<String>,
}

impl<T> Page<T> {
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// The token to fetch the next page, if any.
    pub fn next_page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref()
    }

    /// The common prefixes, only used in object listings with a delimiter.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn has_next_page(&self) -> bool {
        self.next_page_token.is_some()
    }
}

impl<T> From<ListResponse<T>> for Page<T> {
    fn from(value: ListResponse<T>) -> Self {
        Self {
            items: value.items,
            // Some transports report the last page with an empty token.
            next_page_token: value.next_page_token.filter(|t| !t.is_empty()),
            prefixes: value.prefixes,
        }
    }
}

/// Streams all the pages of a list operation.
///
/// Each page is fetched on demand. The stream ends after the first page
/// without a next page token, or after the first error.
#[pin_project]
pub struct Paginator<T> {
    #[pin]
    stream: Pin<Box<dyn Stream<Item = Result<Page<T>>> + Send>>,
}

type ControlFlow = std::ops::ControlFlow<(), Option<String>>;

impl<T> Paginator<T>
where
    T: Send + 'static,
{
    /// Creates a paginator given the initial page token and a function to
    /// fetch each page.
    pub(crate) fn new<E, F>(seed_token: Option<String>, execute: E) -> Self
    where
        E: Fn(Option<String>) -> F + Clone + Send + 'static,
        F: Future<Output = Result<Page<T>>> + Send + 'static,
    {
        let stream = unfold(ControlFlow::Continue(seed_token), move |state| {
            let execute = execute.clone();
            async move {
                let token = match state {
                    ControlFlow::Continue(token) => token,
                    ControlFlow::Break(_) => return None,
                };
                match execute(token).await {
                    Ok(page) => {
                        let next = match page.next_page_token() {
                            None => ControlFlow::Break(()),
                            Some(t) => ControlFlow::Continue(Some(t.to_string())),
                        };
                        Some((Ok(page), next))
                    }
                    Err(e) => Some((Err(e), ControlFlow::Break(()))),
                }
            }
        });
        Self {
            stream: Box::pin(stream),
        }
    }

    /// Returns the next page.
    pub fn next(&mut self) -> futures::stream::Next<'_, Self> {
        StreamExt::next(self)
    }

    /// Flattens the pages into a stream of items.
    pub fn items(self) -> impl Stream<Item = Result<T>> + Send + Unpin {
        Box::pin(self.flat_map(|page| {
            let items: Vec<Result<T>> = match page {
                Ok(p) => p.into_items().into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };
            futures::stream::iter(items)
        }))
    }
}

impl<T> Stream for Paginator<T> {
    type Item = Result<Page<T>>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.project().stream.poll_next(cx)
    }
}

impl<T> std::fmt::Debug for Paginator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator").finish_non_exhaustive()
    }
}
