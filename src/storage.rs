use std::collections::HashMap;

use anyhow::Result;
use colored::Colorize;
use tracing::{info, warn};

use crate::compartments::{self, CompartmentTree};
use crate::error::Error;
use crate::models::Volume;
use crate::oci::OciClient;

const BLOCK_VOLUME_QUERY: &str = "query volume resources";
const BOOT_VOLUME_QUERY: &str = "query bootvolume resources";
const TERMINATED: &str = "TERMINATED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeKind {
    Block,
    Boot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeUsage {
    pub id: String,
    pub display_name: String,
    pub compartment_id: String,
    pub lifecycle_state: String,
    pub size_in_gbs: u64,
    pub kind: VolumeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageReport {
    pub total_gbs: u64,
    /// (compartment id, GBs), largest first.
    pub per_compartment: Vec<(String, u64)>,
}

impl StorageReport {
    /// Terminated volumes are left out of every sum.
    pub fn from_volumes<'a>(volumes: impl IntoIterator<Item = &'a VolumeUsage>) -> Self {
        let mut used: HashMap<&str, u64> = HashMap::new();
        let mut total_gbs = 0;
        for volume in volumes {
            if volume.lifecycle_state == TERMINATED {
                continue;
            }
            *used.entry(volume.compartment_id.as_str()).or_default() += volume.size_in_gbs;
            total_gbs += volume.size_in_gbs;
        }
        let mut per_compartment: Vec<(String, u64)> = used
            .into_iter()
            .map(|(id, gbs)| (id.to_string(), gbs))
            .collect();
        per_compartment.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Self {
            total_gbs,
            per_compartment,
        }
    }

    pub fn total_tbs(&self) -> f64 {
        self.total_gbs as f64 / 1024.0
    }

    pub fn render(&self, region: &str, tree: &CompartmentTree) -> String {
        let mut output = format!(
            "{} {}\n",
            format!(
                "BLOCK STORAGE CONSUMPTION (boot volumes and block volumes) PER COMPARTMENT IN REGION {}:",
                region
            )
            .bold(),
            format!(
                "Total = {} GBs = {:.1} TBs",
                self.total_gbs,
                self.total_tbs()
            )
            .yellow()
        );
        for (compartment_id, gbs) in &self.per_compartment {
            output.push_str(&format!(
                "- {:6} GBs, {}\n",
                gbs,
                tree.display_name(compartment_id)
            ));
        }
        output
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub all_regions: bool,
    pub verbose: bool,
}

pub async fn report(client: &OciClient, options: ReportOptions) -> Result<()> {
    let tree = compartments::load(client).await?;
    let regions = client
        .target_regions(tree.root_id(), options.all_regions)
        .await?;

    for (idx, region) in regions.iter().enumerate() {
        if idx > 0 {
            println!();
        }
        let regional = client.in_region(region);
        let volumes = collect_volumes(&regional).await?;
        if options.verbose {
            print!("{}", render_volumes(&volumes));
        }
        let report = StorageReport::from_volumes(&volumes);
        info!(region = %region, total_gbs = report.total_gbs, "block storage report");
        print!("{}", report.render(region, &tree));
    }
    Ok(())
}

/// Searches block and boot volumes in the client's region and fetches each
/// live one for its size, which the search results do not carry. A volume
/// deleted between the search and the fetch is skipped.
pub async fn collect_volumes(client: &OciClient) -> Result<Vec<VolumeUsage>> {
    let mut volumes = Vec::new();
    for (kind, query) in [
        (VolumeKind::Block, BLOCK_VOLUME_QUERY),
        (VolumeKind::Boot, BOOT_VOLUME_QUERY),
    ] {
        let found = client.search_resources(query).await?;
        for item in found {
            if item.lifecycle_state.as_deref() == Some(TERMINATED) {
                continue;
            }
            let fetched = match kind {
                VolumeKind::Block => client.get_volume(&item.identifier).await,
                VolumeKind::Boot => client.get_boot_volume(&item.identifier).await,
            };
            let Some(volume) = skip_vanished(fetched, &item.identifier)? else {
                continue;
            };
            volumes.push(VolumeUsage {
                id: volume.id,
                display_name: volume.display_name,
                compartment_id: volume.compartment_id,
                lifecycle_state: volume.lifecycle_state,
                size_in_gbs: volume.size_in_gbs,
                kind,
            });
        }
    }
    Ok(volumes)
}

fn skip_vanished(fetched: Result<Volume>, id: &str) -> Result<Option<Volume>> {
    match fetched {
        Ok(volume) => Ok(Some(volume)),
        Err(err) if matches!(err.downcast_ref::<Error>(), Some(Error::ResourceNotFound { .. })) => {
            warn!(id, "volume disappeared before its size was read: {:#}", err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn render_volumes(volumes: &[VolumeUsage]) -> String {
    let mut output = String::new();
    for (kind, title) in [
        (VolumeKind::Block, "LIST OF BLOCK VOLUMES:"),
        (VolumeKind::Boot, "LIST OF BOOT VOLUMES:"),
    ] {
        output.push_str(&format!("{}\n", title.green()));
        for volume in volumes.iter().filter(|volume| volume.kind == kind) {
            output.push_str(&format!(
                "- {}, {:5} GBs, {}\n",
                volume.id, volume.size_in_gbs, volume.display_name
            ));
        }
        output.push('\n');
    }
    output
}
