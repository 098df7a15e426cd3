use anyhow::Context;
use tracing::info;

use crate::{
    hub::ClientConnection,
    protocol::{DeleteAccountRequest, Outbound},
};

use super::Relay;

impl Relay {
    pub(crate) async fn delete_account(
        &self,
        conn: &ClientConnection,
        DeleteAccountRequest { uid }: DeleteAccountRequest,
    ) -> anyhow::Result<()> {
        if uid.is_empty() {
            return Ok(());
        }

        // An identity failure aborts before any data is touched. The account
        // may then be half-removed upstream while its rooms remain here.
        let report = self
            .cascade
            .delete_account(&uid)
            .await
            .with_context(|| format!("identity record of {uid} not removed, account data left in place"))?;
        report.log("delete-account", &uid);
        info!(uid = %uid, "account deleted");

        self.hub.send_to(conn, &Outbound::DeleteSuccess);
        self.hub.broadcast_room_list().await?;
        Ok(())
    }
}
