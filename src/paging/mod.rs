//! Paged list results
//!
//! ARM list operations return `{"value": [...], "nextLink": "..."}`. A
//! [`Pager`] fetches pages on demand, drains them eagerly with
//! [`Pager::complete`], or exposes them lazily as a stream of items.

use std::marker::PhantomData;

use futures::stream::{self, Stream, TryStreamExt};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::arm::client::ArmClient;
use crate::arm::http::{ArmRequest, RawResponse};
use crate::error::{Error, Result};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(default)]
    next_link: Option<String>,
}

/// One page of a list response
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    items: Vec<T>,
    next_link: Option<String>,
}

impl<T> Page<T> {
    /// A blank `next_link` is stored as absent
    pub fn new(items: Vec<T>, next_link: Option<String>) -> Self {
        Self {
            items,
            next_link: next_link.filter(|link| !link.trim().is_empty()),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn next_link(&self) -> Option<&str> {
        self.next_link.as_deref()
    }

    /// True iff there is a continuation link
    pub fn has_more(&self) -> bool {
        self.next_link.is_some()
    }
}

impl<T: DeserializeOwned> Page<T> {
    /// Decode a list response body
    pub fn decode(request: &ArmRequest, response: &RawResponse) -> Result<Self> {
        // An empty body decodes as null
        match response.json::<Option<ListEnvelope<T>>>(request)? {
            Some(envelope) => Ok(Self::new(envelope.value, envelope.next_link)),
            None => Ok(Self::new(Vec::new(), None)),
        }
    }
}

/// Fetches the pages of one list operation
pub struct Pager<T> {
    client: ArmClient,
    operation: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Pager<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            operation: self.operation.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> Pager<T> {
    pub fn new(client: ArmClient, operation: &str) -> Self {
        Self {
            client,
            operation: operation.to_string(),
            _marker: PhantomData,
        }
    }

    /// Fetch one page from `url`
    pub async fn fetch(&self, url: &str) -> Result<Page<T>> {
        let url = self.resolve(url)?;
        let request = ArmRequest::new(&self.operation, Method::GET, &url);
        let response = self.client.execute(&request).await?;
        let page = Page::decode(&request, &response)?;

        tracing::debug!(
            "{}: page with {} items, more: {}",
            self.operation,
            page.items.len(),
            page.has_more()
        );
        Ok(page)
    }

    /// Fetch the page after `page`.
    ///
    /// The link is followed exactly as given; query parameters of the
    /// original request are not re-appended.
    pub async fn load_more(&self, page: &Page<T>) -> Result<Page<T>> {
        match page.next_link() {
            Some(link) => self.fetch(link).await,
            None => Err(Error::NoMorePages),
        }
    }

    /// Drain every page, keeping items accepted by `predicate`, in server order
    pub async fn complete<F>(&self, url: &str, mut predicate: F) -> Result<Vec<T>>
    where
        F: FnMut(&T) -> bool,
    {
        let mut page = self.fetch(url).await?;
        let mut items = Vec::new();

        loop {
            let next = if page.has_more() {
                Some(self.load_more(&page).await?)
            } else {
                None
            };
            items.extend(page.into_items().into_iter().filter(|item| predicate(item)));

            match next {
                Some(next) => page = next,
                None => break,
            }
        }

        Ok(items)
    }

    /// Lazily stream items from `url` onwards, fetching pages as needed
    pub fn stream(&self, url: &str) -> impl Stream<Item = Result<T>> + '_ {
        stream::try_unfold(Some(url.to_string()), move |next| async move {
            let Some(url) = next else {
                return Ok::<_, Error>(None);
            };
            let page = self.fetch(&url).await?;
            let next = page.next_link.clone();
            let items = stream::iter(page.into_items().into_iter().map(Ok::<T, Error>));
            Ok(Some((items, next)))
        })
        .try_flatten()
    }

    /// Relative links are resolved against the client's endpoint
    fn resolve(&self, link: &str) -> Result<String> {
        if url::Url::parse(link).is_ok() {
            return Ok(link.to_string());
        }

        url::Url::parse(self.client.endpoint())
            .and_then(|base| base.join(link))
            .map(String::from)
            .map_err(|source| Error::InvalidPageLink {
                operation: self.operation.clone(),
                link: link.to_string(),
                source,
            })
    }
}
