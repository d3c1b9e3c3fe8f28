use std::fmt;

use anyhow::Result;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::{info, warn};

use crate::compartments::{self, CompartmentTree};
use crate::models::{AutonomousDatabaseSummary, DefinedTags};
use crate::oci::OciClient;

pub const DEFAULT_TAG_NAMESPACE: &str = "osc";
pub const DEFAULT_STOP_KEY: &str = "automatic_shutdown";
pub const DEFAULT_START_KEY: &str = "automatic_startup";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    /// False for dry-run decisions and for `Action::None`.
    pub executed: bool,
}

impl Decision {
    const NONE: Decision = Decision {
        action: Action::None,
        executed: false,
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mode {
    pub confirm_start: bool,
    pub confirm_stop: bool,
}

/// Current hour in the tag format, e.g. `"09:00_UTC"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourTag(String);

impl HourTag {
    pub fn at(moment: OffsetDateTime) -> Self {
        let hour = moment.to_offset(UtcOffset::UTC).hour();
        Self(format!("{:02}:00_UTC", hour))
    }

    pub fn now() -> Self {
        Self::at(OffsetDateTime::now_utc())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HourTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct TagKeys {
    pub namespace: String,
    pub stop_key: String,
    pub start_key: String,
}

impl Default for TagKeys {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_TAG_NAMESPACE.to_string(),
            stop_key: DEFAULT_STOP_KEY.to_string(),
            start_key: DEFAULT_START_KEY.to_string(),
        }
    }
}

impl TagKeys {
    pub fn view<'a>(&self, lifecycle_state: &'a str, tags: &'a DefinedTags) -> ScheduleView<'a> {
        ScheduleView {
            lifecycle_state,
            stop_tag: tag_value(tags, &self.namespace, &self.stop_key),
            start_tag: tag_value(tags, &self.namespace, &self.start_key),
        }
    }
}

/// The inputs a decision depends on, borrowed from a resource.
/// A missing or non-string tag is `None` and never matches an hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleView<'a> {
    pub lifecycle_state: &'a str,
    pub stop_tag: Option<&'a str>,
    pub start_tag: Option<&'a str>,
}

pub fn tag_value<'a>(tags: &'a DefinedTags, namespace: &str, key: &str) -> Option<&'a str> {
    tags.get(namespace)
        .and_then(|keys| keys.get(key))
        .and_then(|value| value.as_str())
}

/// Start wins over stop; the two are exclusive because they need different
/// lifecycle states.
pub fn decide(view: ScheduleView<'_>, hour: &HourTag, mode: Mode) -> Decision {
    let hour = hour.as_str();
    if view.lifecycle_state == "STOPPED" && view.start_tag == Some(hour) {
        Decision {
            action: Action::Start,
            executed: mode.confirm_start,
        }
    } else if view.lifecycle_state == "AVAILABLE" && view.stop_tag == Some(hour) {
        Decision {
            action: Action::Stop,
            executed: mode.confirm_stop,
        }
    } else {
        Decision::NONE
    }
}

/// Where executed decisions are sent.
#[allow(async_fn_in_trait)]
pub trait PowerControl {
    async fn start(&self, id: &str) -> Result<()>;
    async fn stop(&self, id: &str) -> Result<()>;
}

impl PowerControl for OciClient {
    async fn start(&self, id: &str) -> Result<()> {
        self.start_autonomous_database(id).await
    }

    async fn stop(&self, id: &str) -> Result<()> {
        self.stop_autonomous_database(id).await
    }
}

/// Issues the request for an executed decision without waiting for the
/// database to change state. Dry-run decisions send nothing.
pub async fn apply<C: PowerControl>(decision: Decision, id: &str, control: &C) -> Result<()> {
    if !decision.executed {
        return Ok(());
    }
    match decision.action {
        Action::Start => control.start(id).await,
        Action::Stop => control.stop(id).await,
        Action::None => Ok(()),
    }
}

/// A decision taken for one database, with the request error if it failed.
#[derive(Debug)]
pub struct Scheduled<'a> {
    pub adb: &'a AutonomousDatabaseSummary,
    pub decision: Decision,
    pub failure: Option<anyhow::Error>,
}

#[derive(Debug, Clone, Default)]
pub struct SchedulerOptions {
    pub all_regions: bool,
    pub mode: Mode,
    pub keys: TagKeys,
}

/// Decides and applies for every non-terminated database in one compartment.
/// A failed request is recorded on its entry and the sweep moves on.
pub async fn sweep<'a, C: PowerControl>(
    databases: &'a [AutonomousDatabaseSummary],
    keys: &TagKeys,
    hour: &HourTag,
    mode: Mode,
    control: &C,
) -> Vec<Scheduled<'a>> {
    let mut decided = Vec::new();
    for adb in databases {
        if adb.lifecycle_state == "TERMINATED" {
            continue;
        }
        let view = keys.view(&adb.lifecycle_state, &adb.defined_tags);
        if let Some(tag) = view.start_tag.filter(|tag| Some(*tag) == view.stop_tag) {
            warn!(
                id = %adb.id,
                tag,
                "start and stop tags are identical; a manual start in that hour is undone by the next run"
            );
        }
        let decision = decide(view, hour, mode);
        if decision.action == Action::None {
            continue;
        }
        info!(id = %adb.id, action = ?decision.action, executed = decision.executed, "scheduled action");
        let failure = apply(decision, &adb.id, control).await.err();
        if let Some(err) = &failure {
            warn!(id = %adb.id, action = ?decision.action, "request failed: {:#}", err);
        }
        decided.push(Scheduled {
            adb,
            decision,
            failure,
        });
    }
    decided
}

pub fn describe(scheduled: &Scheduled<'_>) -> Option<String> {
    let Scheduled {
        adb,
        decision,
        failure,
    } = scheduled;
    if let Some(err) = failure {
        let verb = match decision.action {
            Action::Start => "starting",
            Action::Stop => "stopping",
            Action::None => return None,
        };
        return Some(format!(
            "ERROR {} autonomous db {} ({}): {:#}",
            verb, adb.display_name, adb.id, err
        ));
    }
    let text = match (decision.action, decision.executed) {
        (Action::None, _) => return None,
        (Action::Start, true) => format!(
            "STARTING autonomous db {} ({})",
            adb.display_name, adb.id
        ),
        (Action::Stop, true) => format!(
            "STOPPING autonomous db {} ({})",
            adb.display_name, adb.id
        ),
        (Action::Start, false) => format!(
            "Autonomous DB {} ({}) SHOULD BE STARTED --> re-run with --confirm-start to actually start databases",
            adb.display_name, adb.id
        ),
        (Action::Stop, false) => format!(
            "Autonomous DB {} ({}) SHOULD BE STOPPED --> re-run with --confirm-stop to actually stop databases",
            adb.display_name, adb.id
        ),
    };
    Some(text)
}

pub async fn run(client: &OciClient, options: SchedulerOptions) -> Result<()> {
    let hour = HourTag::now();
    let pid = std::process::id();
    println!("{}: BEGIN SCRIPT PID={}", timestamp(true), pid);
    info!(hour = %hour, mode = ?options.mode, "scheduler run");

    let tree = compartments::load(client).await?;
    let regions = client
        .target_regions(tree.root_id(), options.all_regions)
        .await?;

    for region in &regions {
        let regional = client.in_region(region);
        process_region(&regional, &tree, &hour, &options).await?;
    }

    println!("{}: END SCRIPT PID={}", timestamp(true), pid);
    Ok(())
}

async fn process_region(
    client: &OciClient,
    tree: &CompartmentTree,
    hour: &HourTag,
    options: &SchedulerOptions,
) -> Result<()> {
    let compartment_ids = std::iter::once(tree.root_id()).chain(
        tree.compartments()
            .iter()
            .filter(|compartment| !compartment.is_deleted())
            .map(|compartment| compartment.id.as_str()),
    );
    for compartment_id in compartment_ids {
        let databases = client.list_autonomous_databases(compartment_id).await?;
        let decided = sweep(&databases, &options.keys, hour, options.mode, client).await;
        for scheduled in &decided {
            if let Some(message) = describe(scheduled) {
                println!(
                    "{}, {}, {}: {}",
                    timestamp(false),
                    client.region(),
                    tree.display_name(compartment_id),
                    message
                );
            }
        }
    }
    Ok(())
}

fn timestamp(with_date: bool) -> String {
    let now = OffsetDateTime::now_utc();
    let formatted = if with_date {
        now.format(format_description!(
            "[year]/[month]/[day] [hour]:[minute]:[second]"
        ))
    } else {
        now.format(format_description!("[hour]:[minute]:[second]"))
    };
    formatted.unwrap_or_else(|_| "now".to_string())
}
