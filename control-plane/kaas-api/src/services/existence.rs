use crate::cluster::{ClusterClient, ResourceKind};
use crate::errors::{ConflictReason, ProvisionError};
use crate::templates::ResourceNames;
use tracing::debug;

/// Kinds probed before an unmanaged deploy, in probe order.
pub const CHECK_ORDER: [ResourceKind; 5] = [
    ResourceKind::Secret,
    ResourceKind::ConfigMap,
    ResourceKind::Deployment,
    ResourceKind::Service,
    ResourceKind::Ingress,
];

/// Fails with the first kind already present under `names`. The ingress is
/// probed even when the request does not ask for one.
pub async fn ensure_names_free(
    cluster: &dyn ClusterClient,
    names: &ResourceNames,
) -> Result<(), ProvisionError> {
    for kind in CHECK_ORDER {
        let name = names.for_kind(kind);
        match cluster.lookup(kind, &name).await {
            Err(e) if e.is_not_found() => continue,
            Ok(()) => {
                debug!(%kind, %name, "name already taken");
                return Err(match ConflictReason::from_kind(kind) {
                    Some(reason) => ProvisionError::Conflict(reason),
                    None => ProvisionError::Cluster(
                        crate::cluster::ClusterError::AlreadyExists { kind, name },
                    ),
                });
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
