use crate::client::{Client, UserRef};
use crate::error::Result;
use crate::lookup::resolve;
use crate::paging::{paginate, Page};
use crate::quota::OperationClass;
use crate::user::User;
use crate::utils::api_datetime;

use chrono::{DateTime, Utc};

use futures::Stream;

use serde::{Deserialize, Serialize};

use serde_with::formats::CommaSeparator;
use serde_with::serde_as;

/// Page size requested for timeline listings.
const TIMELINE_PAGE_SIZE: u16 = 200;

/// A geographic point attached to a post, in `[longitude, latitude]` order.
#[derive(Debug, PartialEq, Clone, Deserialize)]
pub struct Point {
    pub coordinates: [f64; 2],
}

/// A single post, as returned by timelines, bulk lookup and the push feed.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[non_exhaustive]
pub struct Post {
    pub id: u64,
    /// The post body. Extended-entity responses call this field `full_text`.
    #[serde(alias = "full_text")]
    pub text: String,
    #[serde(deserialize_with = "api_datetime")]
    pub created_at: DateTime<Utc>,
    /// The author. Absent in some trimmed payload shapes.
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub in_reply_to_status_id: Option<u64>,
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub favorite_count: u64,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Point>,
}

#[derive(Debug, Serialize)]
struct TimelineQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    screen_name: Option<&'a str>,
    count: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_id: Option<u64>,
}

type CommaSeparated<T> = serde_with::StringWithSeparator<CommaSeparator, T>;

#[serde_as]
#[derive(Debug, Serialize)]
struct LookupPostsQuery {
    #[serde_as(as = "CommaSeparated<u64>")]
    id: Vec<u64>,
    include_entities: bool,
}

impl Client {
    /// Returns a Stream over `user`'s timeline, newest post first.
    ///
    /// ```no_run
    /// # use aviary::client::{AuthMode, Client};
    /// use futures::prelude::*;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> aviary::error::Result<()> {
    /// let client = Client::new(
    ///     "https://api.example.com",
    ///     "MyProject/1.0 (by my@email)",
    ///     AuthMode::User,
    /// )?;
    ///
    /// let timeline = client.user_timeline("somebody").take(50);
    /// futures::pin_mut!(timeline);
    ///
    /// while let Some(post) = timeline.next().await {
    ///     println!("{}", post?.text);
    /// }
    /// # Ok(()) }
    /// ```
    ///
    /// Pages are fetched on demand and paced against the `Timeline` quota; an empty page
    /// ends the stream.
    pub fn user_timeline(&self, user: impl Into<UserRef>) -> impl Stream<Item = Result<Post>> + '_ {
        let user = user.into();

        paginate(
            self.pacing(),
            OperationClass::Timeline,
            None::<u64>,
            move |max_id| {
                let user = user.clone();
                let client = self;

                async move {
                    let (user_id, screen_name) = user.split();

                    let posts: Vec<Post> = client
                        .get_json_endpoint_query(
                            "/statuses/user_timeline.json",
                            &TimelineQuery {
                                user_id,
                                screen_name,
                                count: TIMELINE_PAGE_SIZE,
                                max_id,
                            },
                        )
                        .await?;

                    // max_id is inclusive, so the next page starts just below the oldest
                    // post of this one.
                    let next = posts
                        .iter()
                        .map(|post| post.id)
                        .min()
                        .map(|oldest| Some(oldest.saturating_sub(1)));

                    Ok(Page { items: posts, next })
                }
            },
        )
    }

    /// Resolve a list of post ids into full [`Post`] records, in bulk.
    ///
    /// At most a batch of ids per paced `Lookup` request (100 by default, see
    /// [`Self::lookup_batch_size`]). Deleted or protected posts are simply absent from the
    /// output. `include_entities` asks the remote side for extended entity metadata.
    pub fn lookup_posts(
        &self,
        ids: Vec<u64>,
        include_entities: bool,
    ) -> impl Stream<Item = Result<Post>> + '_ {
        resolve(
            self.pacing(),
            OperationClass::Lookup,
            self.lookup_batch,
            ids,
            move |batch| {
                let client = self;

                async move {
                    client
                        .get_json_endpoint_query(
                            "/statuses/lookup.json",
                            &LookupPostsQuery {
                                id: batch,
                                include_entities,
                            },
                        )
                        .await
                }
            },
        )
    }
}
