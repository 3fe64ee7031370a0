use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::Cid,
    protocol::{ChannelSnapshot, QueryChannelsRequest},
};

#[async_trait]
pub trait ChannelTransport: Send + Sync {
    async fn query_channel(&self, cid: &Cid) -> Result<ChannelSnapshot>;
    async fn query_channels(&self, request: &QueryChannelsRequest) -> Result<Vec<ChannelSnapshot>>;
    async fn mark_read(&self, cid: &Cid) -> Result<()>;
}

pub struct MissingChannelTransport;

#[async_trait]
impl ChannelTransport for MissingChannelTransport {
    async fn query_channel(&self, cid: &Cid) -> Result<ChannelSnapshot> {
        Err(anyhow!("no transport configured to query channel {cid}"))
    }

    async fn query_channels(
        &self,
        _request: &QueryChannelsRequest,
    ) -> Result<Vec<ChannelSnapshot>> {
        Err(anyhow!("no transport configured to query channels"))
    }

    async fn mark_read(&self, cid: &Cid) -> Result<()> {
        Err(anyhow!("no transport configured to mark channel {cid} read"))
    }
}
