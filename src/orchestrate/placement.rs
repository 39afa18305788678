//! Where a rebuilt instance lands in the secondary region.

use std::net::Ipv4Addr;

use serde::Serialize;

use super::error::ValidationError;

/// Target placement for a restored or cloned instance.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TargetPlacement {
    /// Display name of the new instance. Must not already exist.
    pub display_name: String,
    /// Target compartment.
    pub compartment_id: String,
    /// Target availability domain for the instance and its volumes.
    pub availability_domain: String,
    /// Subnet for the primary VNIC.
    pub subnet_id: String,
    /// Private address requested inside `subnet_id`.
    pub private_ip: Ipv4Addr,
}

impl TargetPlacement {
    /// Starts a builder for a [`TargetPlacement`].
    #[must_use]
    pub fn builder() -> TargetPlacementBuilder {
        TargetPlacementBuilder::default()
    }

    /// Checks that every string field is populated.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] naming the first empty field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("display_name", &self.display_name),
            ("compartment_id", &self.compartment_id),
            ("availability_domain", &self.availability_domain),
            ("subnet_id", &self.subnet_id),
        ];
        match fields.into_iter().find(|(_, value)| value.is_empty()) {
            Some((field, _)) => Err(ValidationError::MissingField(field)),
            None => Ok(()),
        }
    }
}

/// Builder for [`TargetPlacement`]; trims inputs and validates on build.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TargetPlacementBuilder {
    display_name: String,
    compartment_id: String,
    availability_domain: String,
    subnet_id: String,
    private_ip: Option<Ipv4Addr>,
}

impl TargetPlacementBuilder {
    /// Sets the instance display name.
    #[must_use]
    pub fn display_name(mut self, value: impl Into<String>) -> Self {
        self.display_name = value.into();
        self
    }

    /// Sets the compartment.
    #[must_use]
    pub fn compartment_id(mut self, value: impl Into<String>) -> Self {
        self.compartment_id = value.into();
        self
    }

    /// Sets the availability domain.
    #[must_use]
    pub fn availability_domain(mut self, value: impl Into<String>) -> Self {
        self.availability_domain = value.into();
        self
    }

    /// Sets the subnet.
    #[must_use]
    pub fn subnet_id(mut self, value: impl Into<String>) -> Self {
        self.subnet_id = value.into();
        self
    }

    /// Sets the private address.
    #[must_use]
    pub const fn private_ip(mut self, value: Ipv4Addr) -> Self {
        self.private_ip = Some(value);
        self
    }

    /// Builds and validates the placement.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] when a field is empty or the
    /// private address was never set.
    pub fn build(self) -> Result<TargetPlacement, ValidationError> {
        let private_ip = self
            .private_ip
            .ok_or(ValidationError::MissingField("private_ip"))?;
        let placement = TargetPlacement {
            display_name: self.display_name.trim().to_owned(),
            compartment_id: self.compartment_id.trim().to_owned(),
            availability_domain: self.availability_domain.trim().to_owned(),
            subnet_id: self.subnet_id.trim().to_owned(),
            private_ip,
        };
        placement.validate()?;
        Ok(placement)
    }
}
