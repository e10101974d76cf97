//! Instance metadata: version, demo flag and the contact admin.

use std::sync::Arc;

use userhub_api::messages::InstanceProfile;
use userhub_store::Store;

use super::{ServiceError, to_api_user};

pub struct InstanceService {
    store: Arc<Store>,
    version: String,
    demo: bool,
}

impl InstanceService {
    #[must_use]
    pub fn new(store: Arc<Store>, version: String, demo: bool) -> Self {
        Self {
            store,
            version,
            demo,
        }
    }

    /// The public instance profile. The admin lookup is served from the
    /// store's instance cache, so repeated calls stay cheap.
    pub async fn get_profile(&self) -> Result<InstanceProfile, ServiceError> {
        let admin = self.store.first_admin_user().await?;
        Ok(InstanceProfile {
            version: self.version.clone(),
            demo: self.demo,
            admin: admin.as_ref().map(to_api_user),
        })
    }
}
