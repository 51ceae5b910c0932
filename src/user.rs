use crate::client::{Client, UserRef};
use crate::error::Result;
use crate::lookup::resolve;
use crate::paging::{paginate, Page};
use crate::quota::OperationClass;
use crate::utils::api_datetime;

use chrono::{DateTime, Utc};

use futures::Stream;

use serde::{Deserialize, Serialize};

use serde_with::formats::CommaSeparator;
use serde_with::serde_as;

/// Page size requested for associate id listings.
const ASSOCIATE_PAGE_SIZE: u16 = 5000;

/// An account on the platform.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[non_exhaustive]
pub struct User {
    pub id: u64,
    pub screen_name: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub followers_count: u64,
    pub friends_count: u64,
    pub statuses_count: u64,
    pub protected: bool,
    #[serde(default)]
    pub verified: bool,
    #[serde(deserialize_with = "api_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct AssociatesQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    screen_name: Option<&'a str>,
    cursor: i64,
    count: u16,
}

/// One page of a cursored id listing. `next_cursor` of zero is the end marker.
#[derive(Debug, Deserialize)]
struct IdPage {
    ids: Vec<u64>,
    next_cursor: i64,
}

type CommaSeparated<T> = serde_with::StringWithSeparator<CommaSeparator, T>;

#[serde_as]
#[derive(Debug, Serialize)]
struct LookupUsersQuery {
    #[serde_as(as = "CommaSeparated<u64>")]
    user_id: Vec<u64>,
    include_entities: bool,
}

impl Client {
    fn associate_ids(
        &self,
        endpoint: &'static str,
        user: UserRef,
    ) -> impl Stream<Item = Result<u64>> + '_ {
        paginate(
            self.pacing(),
            OperationClass::Associates,
            -1i64,
            move |cursor| {
                let user = user.clone();
                let client = self;

                async move {
                    let (user_id, screen_name) = user.split();

                    let page: IdPage = client
                        .get_json_endpoint_query(
                            endpoint,
                            &AssociatesQuery {
                                user_id,
                                screen_name,
                                cursor,
                                count: ASSOCIATE_PAGE_SIZE,
                            },
                        )
                        .await?;

                    let next = match page.next_cursor {
                        0 => None,
                        cursor => Some(cursor),
                    };

                    Ok(Page {
                        items: page.ids,
                        next,
                    })
                }
            },
        )
    }

    /// Returns a Stream over the ids of every account following `user`, newest first.
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
    /// let followers = client.follower_ids("somebody");
    /// futures::pin_mut!(followers);
    ///
    /// while let Some(id) = followers.next().await {
    ///     println!("{}", id?);
    /// }
    /// # Ok(()) }
    /// ```
    ///
    /// Every page request is paced against the `Associates` quota, so consuming the whole
    /// stream for a large account takes a long time on purpose.
    pub fn follower_ids(&self, user: impl Into<UserRef>) -> impl Stream<Item = Result<u64>> + '_ {
        self.associate_ids("/followers/ids.json", user.into())
    }

    /// Returns a Stream over the ids of every account `user` follows, newest first.
    ///
    /// Paced against the `Associates` quota, like [`Self::follower_ids`].
    pub fn friend_ids(&self, user: impl Into<UserRef>) -> impl Stream<Item = Result<u64>> + '_ {
        self.associate_ids("/friends/ids.json", user.into())
    }

    /// Resolve a list of account ids into full [`User`] records, in bulk.
    ///
    /// Ids are resolved in order, at most a batch per paced `Lookup` request. Ids without a
    /// match (suspended or deleted accounts) are simply absent from the output; that is not
    /// an error.
    pub fn lookup_users(
        &self,
        ids: Vec<u64>,
        include_entities: bool,
    ) -> impl Stream<Item = Result<User>> + '_ {
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
                            "/users/lookup.json",
                            &LookupUsersQuery {
                                user_id: batch,
                                include_entities,
                            },
                        )
                        .await
                }
            },
        )
    }
}
