use anyhow::Result;
use tracing::info;

use crate::error::Error;
use crate::models::DefinedTags;
use crate::oci::OciClient;

/// Drops `namespace.key` from `tags`, returning the removed value. An
/// emptied namespace stays in the map.
pub fn remove_defined_tag(
    tags: &mut DefinedTags,
    namespace: &str,
    key: &str,
) -> Result<serde_json::Value, Error> {
    tags.get_mut(namespace)
        .and_then(|keys| keys.remove(key))
        .ok_or_else(|| Error::TagNotPresent {
            namespace: namespace.to_string(),
            key: key.to_string(),
        })
}

pub async fn remove_from_instance(
    client: &OciClient,
    instance_id: &str,
    namespace: &str,
    key: &str,
) -> Result<()> {
    let instance = client.get_instance(instance_id).await?;
    let mut tags = instance.defined_tags;
    let removed = remove_defined_tag(&mut tags, namespace, key)?;
    info!(instance = %instance_id, namespace, key, value = %removed, "removing defined tag");
    client.update_instance_tags(instance_id, &tags).await?;
    println!(
        "Tag {}.{} removed from instance {} ({})",
        namespace, key, instance.display_name, instance_id
    );
    Ok(())
}
