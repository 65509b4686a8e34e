//! Scoreboard feed: the schedule snapshot the settler polls every cycle.

use {
    crate::traits::ScoreFeed,
    anyhow::{Context, Result},
    serde::Deserialize,
    std::time::Duration,
    url::Url,
};

const USER_AGENT: &str = "game-settler/0.1.0";

/// One fetched record describing a game's current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSnapshot {
    /// Stable across polls.
    pub id: String,
    pub name: String,
    pub completed: bool,
    /// Competitors of the first competition of the event. Further
    /// competitions are ignored.
    pub pairing: Option<[CompetitorRecord; 2]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetitorRecord {
    pub display_name: String,
    pub short_name: String,
    /// `None` if the feed reported a missing or non-numeric score.
    pub score: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ScoreboardResponse {
    /// Decoded one by one so a single malformed event doesn't hide the rest.
    #[serde(default)]
    events: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Event {
    id: String,
    #[serde(default)]
    name: String,
    status: Status,
    #[serde(default)]
    competitions: Vec<Competition>,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(rename = "type")]
    kind: StatusType,
}

#[derive(Debug, Deserialize)]
struct StatusType {
    #[serde(default)]
    completed: bool,
}

#[derive(Debug, Deserialize)]
struct Competition {
    #[serde(default)]
    competitors: Vec<Competitor>,
}

#[derive(Debug, Deserialize)]
struct Competitor {
    team: Team,
    score: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Team {
    display_name: String,
    #[serde(default)]
    short_display_name: String,
}

impl From<Competitor> for CompetitorRecord {
    fn from(competitor: Competitor) -> Self {
        Self {
            score: competitor
                .score
                .as_deref()
                .and_then(|score| score.trim().parse().ok()),
            display_name: competitor.team.display_name,
            short_name: competitor.team.short_display_name,
        }
    }
}

impl From<Event> for EventSnapshot {
    fn from(event: Event) -> Self {
        let pairing = event.competitions.into_iter().next().and_then(|competition| {
            let mut competitors = competition
                .competitors
                .into_iter()
                .map(CompetitorRecord::from);
            Some([competitors.next()?, competitors.next()?])
        });
        Self {
            id: event.id,
            name: event.name,
            completed: event.status.kind.completed,
            pairing,
        }
    }
}

fn parse_scoreboard(body: &str) -> Result<Vec<EventSnapshot>> {
    let response: ScoreboardResponse =
        serde_json::from_str(body).context("failed to decode scoreboard")?;
    Ok(response
        .events
        .into_iter()
        .filter_map(|event| {
            let id = event.get("id").cloned();
            match serde_json::from_value::<Event>(event) {
                Ok(event) => Some(EventSnapshot::from(event)),
                Err(err) => {
                    tracing::warn!(?err, ?id, "skipping malformed scoreboard event");
                    None
                }
            }
        })
        .collect())
}

/// Client for ESPN's public scoreboard API. No API key required.
pub struct EspnScoreboard {
    client: reqwest::Client,
    url: Url,
}

impl EspnScoreboard {
    pub const DEFAULT_URL: &'static str =
        "https://site.api.espn.com/apis/site/v2/sports/football/nfl/scoreboard";

    pub fn new(url: Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build scoreboard http client")?;
        Ok(Self { client, url })
    }

    async fn try_fetch(&self) -> Result<Vec<EventSnapshot>> {
        let body = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .context("failed to make request")?
            .error_for_status()
            .context("response status is not success")?
            .text()
            .await
            .context("failed to read response body")?;
        parse_scoreboard(&body)
    }
}

#[async_trait::async_trait]
impl ScoreFeed for EspnScoreboard {
    async fn fetch(&self) -> Vec<EventSnapshot> {
        match self.try_fetch().await {
            Ok(events) => {
                tracing::debug!(events = events.len(), "fetched scoreboard");
                events
            }
            Err(err) => {
                tracing::error!(?err, url = %self.url, "failed to fetch scoreboard");
                Vec::new()
            }
        }
    }
}
