//! Pre-flight checks run before any resource is created.

use std::net::Ipv4Addr;

use tracing::debug;

use super::error::{OrchestrationError, Stage, ValidationError};
use super::placement::TargetPlacement;
use crate::model::is_supported_shape;
use crate::provider::{InventoryProvider, NetworkDirectory};
use crate::region::{RegionContext, RegionPair};

/// Parses an IPv4 CIDR block such as `10.0.1.0/24`.
///
/// Returns the network address and prefix length, or `None` when the text is
/// not a valid IPv4 CIDR.
#[must_use]
pub fn parse_ipv4_cidr(cidr: &str) -> Option<(Ipv4Addr, u8)> {
    let (address_text, prefix_text) = cidr.trim().split_once('/')?;
    let network: Ipv4Addr = address_text.parse().ok()?;
    let prefix: u8 = prefix_text.parse().ok()?;
    (prefix <= 32).then_some((network, prefix))
}

/// Whether `address` lies inside the network described by `cidr`.
///
/// Returns `None` when `cidr` cannot be parsed.
#[must_use]
pub fn cidr_contains(cidr: &str, address: Ipv4Addr) -> Option<bool> {
    let (network, prefix) = parse_ipv4_cidr(cidr)?;
    let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
    Some(u32::from(network) & mask == u32::from(address) & mask)
}

pub(super) fn ensure_supported_shape(shape: &str) -> Result<(), ValidationError> {
    if is_supported_shape(shape) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedShape(shape.to_owned()))
    }
}

pub(super) async fn ensure_name_available<P>(
    provider: &P,
    region: &RegionContext,
    placement: &TargetPlacement,
) -> Result<(), OrchestrationError<P::Error>>
where
    P: InventoryProvider,
{
    let existing = provider
        .find_instances_by_name(region, &placement.compartment_id, &placement.display_name)
        .await
        .map_err(|err| OrchestrationError::provider(Stage::Validate, err))?;
    if existing.is_empty() {
        debug!(name = %placement.display_name, "target instance name is free");
        Ok(())
    } else {
        Err(ValidationError::InstanceNameTaken {
            name: placement.display_name.clone(),
            compartment_id: placement.compartment_id.clone(),
            region: region.name().to_owned(),
        }
        .into())
    }
}

pub(super) async fn ensure_private_ip_available<P>(
    provider: &P,
    region: &RegionContext,
    placement: &TargetPlacement,
) -> Result<(), OrchestrationError<P::Error>>
where
    P: NetworkDirectory,
{
    let subnet = provider
        .get_subnet(region, &placement.subnet_id)
        .await
        .map_err(|err| OrchestrationError::provider(Stage::Validate, err))?;
    let inside = cidr_contains(&subnet.cidr_block, placement.private_ip).ok_or_else(|| {
        ValidationError::InvalidSubnetCidr {
            subnet_id: subnet.id.clone(),
            cidr: subnet.cidr_block.clone(),
        }
    })?;
    if !inside {
        return Err(ValidationError::PrivateIpOutsideSubnet {
            address: placement.private_ip,
            subnet_id: subnet.id,
            cidr: subnet.cidr_block,
        }
        .into());
    }

    let holder = provider
        .find_private_ip(region, &placement.subnet_id, placement.private_ip)
        .await
        .map_err(|err| OrchestrationError::provider(Stage::Validate, err))?;
    match holder {
        Some(_) => Err(ValidationError::PrivateIpInUse {
            address: placement.private_ip,
            subnet_id: placement.subnet_id.clone(),
        }
        .into()),
        None => Ok(()),
    }
}

pub(super) async fn ensure_regions_subscribed<P>(
    provider: &P,
    regions: &RegionPair,
) -> Result<(), OrchestrationError<P::Error>>
where
    P: NetworkDirectory,
{
    let subscriptions = provider
        .list_region_subscriptions(&regions.primary)
        .await
        .map_err(|err| OrchestrationError::provider(Stage::Validate, err))?;
    for region in [&regions.primary, &regions.secondary] {
        let subscribed = subscriptions
            .iter()
            .any(|sub| sub.region_name == region.name() && sub.is_ready());
        if !subscribed {
            return Err(ValidationError::RegionNotSubscribed(region.name().to_owned()).into());
        }
    }
    Ok(())
}
