//! Offset-driven paging over plugin listings.
use futures_util::{Stream, TryStreamExt, stream};

use crate::{
    core::resource::Resource,
    ports::admin_client::{
        AdminClient, AdminClientError, AdminResult, Headers, PluginQuery, PluginScope,
    },
};

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Lazy stream of plugin pages in `scope`, in server order.
///
/// Each request asks for [`PLUGIN_PAGE_SIZE`](crate::ports::admin_client::PLUGIN_PAGE_SIZE)
/// records and passes on the offset returned by the previous page. The stream
/// ends after the first page that carries no offset; the first error ends it too.
/// Restarting means calling this function again: nothing is cached.
pub fn plugin_pages<'a>(
    client: &'a dyn AdminClient,
    scope: &'a PluginScope,
    headers: &'a Headers,
) -> impl Stream<Item = AdminResult<Vec<Resource>>> + Send + 'a {
    pages(client, scope, None, headers)
}

/// Like [`plugin_pages`], restricted to plugins called `name`.
pub fn named_plugin_pages<'a>(
    client: &'a dyn AdminClient,
    scope: &'a PluginScope,
    name: &'a str,
    headers: &'a Headers,
) -> impl Stream<Item = AdminResult<Vec<Resource>>> + Send + 'a {
    pages(client, scope, Some(name), headers)
}

fn pages<'a>(
    client: &'a dyn AdminClient,
    scope: &'a PluginScope,
    name: Option<&'a str>,
    headers: &'a Headers,
) -> impl Stream<Item = AdminResult<Vec<Resource>>> + Send + 'a {
    stream::try_unfold(Cursor::Start, move |cursor| async move {
        let offset = match cursor {
            Cursor::Start => None,
            Cursor::Next(offset) => Some(offset),
            Cursor::Done => return Ok(None),
        };

        let query = PluginQuery {
            name: name.map(str::to_owned),
            ..PluginQuery::page(scope.clone(), offset)
        };
        let page = client.get_plugins(&query, headers).await?.body;
        let next = match page.offset {
            Some(offset) => Cursor::Next(offset),
            None => Cursor::Done,
        };

        Ok::<_, AdminClientError>(Some((page.data, next)))
    })
}

/// Collect every plugin in `scope`, concatenating pages in order.
pub async fn collect_plugins(
    client: &dyn AdminClient,
    scope: &PluginScope,
    headers: &Headers,
) -> AdminResult<Vec<Resource>> {
    plugin_pages(client, scope, headers).try_concat().await
}
