//! Chain follower feeding blocks into the watch engine.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use anyhow::bail;
use async_trait::async_trait;
use bitcoin::{Block, BlockHash};
use bitcoind_async_client::traits::Reader;
use tracing::*;
use vault_signing::OutpointSpentAttestation;

use crate::watcher::OutpointWatcher;

/// Source of blocks by height.
#[async_trait]
pub trait BlockFetcher: Send + Sync {
    /// Height and hash of the current best block.
    async fn tip(&self) -> anyhow::Result<(u64, BlockHash)>;

    async fn block_hash(&self, height: u64) -> anyhow::Result<BlockHash>;

    async fn block_at(&self, height: u64) -> anyhow::Result<Block>;
}

#[async_trait]
impl<T: BlockFetcher + ?Sized> BlockFetcher for Arc<T> {
    async fn tip(&self) -> anyhow::Result<(u64, BlockHash)> {
        self.as_ref().tip().await
    }

    async fn block_hash(&self, height: u64) -> anyhow::Result<BlockHash> {
        self.as_ref().block_hash(height).await
    }

    async fn block_at(&self, height: u64) -> anyhow::Result<Block> {
        self.as_ref().block_at(height).await
    }
}

/// [`BlockFetcher`] backed by a bitcoind RPC client.
#[derive(Debug)]
pub struct BitcoindFetcher<R>(Arc<R>);

impl<R> BitcoindFetcher<R> {
    pub fn new(client: Arc<R>) -> Self {
        Self(client)
    }
}

#[async_trait]
impl<R: Reader + Send + Sync> BlockFetcher for BitcoindFetcher<R> {
    async fn tip(&self) -> anyhow::Result<(u64, BlockHash)> {
        let chain_info = self.0.get_blockchain_info().await?;
        let best = chain_info.best_block_hash;
        Ok((chain_info.blocks.into(), best))
    }

    async fn block_hash(&self, height: u64) -> anyhow::Result<BlockHash> {
        Ok(self.0.get_block_hash(height).await?)
    }

    async fn block_at(&self, height: u64) -> anyhow::Result<Block> {
        Ok(self.0.get_block_at(height).await?)
    }
}

#[derive(Clone, Debug)]
pub struct FollowerConfig {
    pub poll_interval: Duration,

    /// How many recent block hashes are kept to locate a reorg pivot.
    pub reorg_lookback: usize,
}

/// Polls a [`BlockFetcher`] and drives an [`OutpointWatcher`] along the best chain.
#[derive(Debug)]
pub struct ChainFollower<F> {
    fetcher: F,
    watcher: Arc<OutpointWatcher>,
    config: FollowerConfig,
    next_height: u64,
    recent: VecDeque<(u64, BlockHash)>,
}

impl<F: BlockFetcher> ChainFollower<F> {
    pub fn new(
        fetcher: F,
        watcher: Arc<OutpointWatcher>,
        start_height: u64,
        config: FollowerConfig,
    ) -> Self {
        Self {
            fetcher,
            watcher,
            config,
            next_height: start_height,
            recent: VecDeque::new(),
        }
    }

    pub fn next_height(&self) -> u64 {
        self.next_height
    }

    /// Main loop.  Poll errors are logged and retried on the next tick.
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!(next_height = %self.next_height, "started chain follower");
        loop {
            match self.poll_once().await {
                Ok(atts) if !atts.is_empty() => {
                    debug!(count = atts.len(), "emitted attestations");
                }
                Ok(_) => {}
                Err(err) => warn!(%err, "failed to poll bitcoin client"),
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Processes any new blocks, reverting first if the chain reorged below our
    /// last seen block.  Returns the attestations emitted along the way.
    pub async fn poll_once(&mut self) -> anyhow::Result<Vec<OutpointSpentAttestation>> {
        let (tip_height, tip_hash) = self.fetcher.tip().await?;
        if self.recent.back().map(|(_, h)| h) == Some(&tip_hash) {
            trace!("polled client, nothing to do");
            return Ok(Vec::new());
        }

        if let Some(&(last_height, _)) = self.recent.back() {
            match self.find_pivot().await? {
                Some(pivot) if pivot < last_height => {
                    info!(%pivot, %last_height, "found apparent reorg");
                    self.rollback_to(pivot);
                }
                Some(_) => {}
                None => {
                    error!("unable to find common block with client chain");
                    bail!("no common block within reorg lookback");
                }
            }
        }

        let mut emitted = Vec::new();
        for height in self.next_height..=tip_height {
            let block = match self.fetcher.block_at(height).await {
                Ok(block) => block,
                Err(err) => {
                    warn!(%height, %err, "failed to fetch new block");
                    break;
                }
            };
            let blkid = block.block_hash();
            emitted.extend(self.watcher.process_block(height, &block)?);
            self.accept_block(height, blkid);
            debug!(%height, %blkid, "accepted new block");
        }
        Ok(emitted)
    }

    /// Highest recent block the client still agrees with.
    async fn find_pivot(&self) -> anyhow::Result<Option<u64>> {
        for (height, blkid) in self.recent.iter().rev() {
            let queried = self.fetcher.block_hash(*height).await?;
            trace!(%height, %blkid, %queried, "comparing blocks to find pivot");
            if queried == *blkid {
                return Ok(Some(*height));
            }
        }
        Ok(None)
    }

    fn rollback_to(&mut self, height: u64) {
        while self.recent.back().is_some_and(|(h, _)| *h > height) {
            self.recent.pop_back();
        }
        self.watcher.revert_to(height);
        self.next_height = height + 1;
    }

    fn accept_block(&mut self, height: u64, blkid: BlockHash) {
        self.recent.push_back((height, blkid));
        while self.recent.len() > self.config.reorg_lookback.max(1) {
            self.recent.pop_front();
        }
        self.next_height = height + 1;
    }
}

/// Re-scans `from..=to`, returning the attestations for every attested spend in
/// the range and feeding the blocks through the watcher for spends it missed.
pub async fn backfill(
    fetcher: &impl BlockFetcher,
    watcher: &OutpointWatcher,
    from: u64,
    to: u64,
) -> anyhow::Result<Vec<OutpointSpentAttestation>> {
    let mut out = Vec::new();
    for height in from..=to {
        let block = fetcher.block_at(height).await?;
        out.extend(watcher.replay_block(height, &block)?);
        out.extend(watcher.process_block(height, &block)?);
    }
    info!(%from, %to, count = out.len(), "backfilled attestations");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use bitcoin::{
        block::{Header, Version as BlockVersion},
        hashes::Hash,
        CompactTarget, Transaction, TxMerkleNode,
    };
    use parking_lot::Mutex;
    use vault_primitives::OutpointRef;
    use vault_test_utils::{
        keys::{recipient_script, signer_secret},
        tx::{make_inputs, spend_of},
    };

    use super::*;

    /// In-memory chain, index is height.
    #[derive(Debug, Default)]
    struct MemChain {
        blocks: Mutex<Vec<Block>>,
    }

    impl MemChain {
        fn push(&self, txs: Vec<Transaction>, salt: u32) {
            let mut blocks = self.blocks.lock();
            let nonce = blocks.len() as u32 * 1000 + salt;
            blocks.push(Block {
                header: Header {
                    version: BlockVersion::TWO,
                    prev_blockhash: BlockHash::all_zeros(),
                    merkle_root: TxMerkleNode::all_zeros(),
                    time: 0,
                    bits: CompactTarget::from_consensus(0x207fffff),
                    nonce,
                },
                txdata: txs,
            });
        }

        fn truncate(&self, len: usize) {
            self.blocks.lock().truncate(len);
        }
    }

    #[async_trait]
    impl BlockFetcher for MemChain {
        async fn tip(&self) -> anyhow::Result<(u64, BlockHash)> {
            let blocks = self.blocks.lock();
            let Some(last) = blocks.last() else {
                bail!("empty chain");
            };
            Ok((blocks.len() as u64 - 1, last.block_hash()))
        }

        async fn block_hash(&self, height: u64) -> anyhow::Result<BlockHash> {
            Ok(self.block_at(height).await?.block_hash())
        }

        async fn block_at(&self, height: u64) -> anyhow::Result<Block> {
            match self.blocks.lock().get(height as usize) {
                Some(b) => Ok(b.clone()),
                None => bail!("no block at {height}"),
            }
        }
    }

    fn config() -> FollowerConfig {
        FollowerConfig {
            poll_interval: Duration::from_millis(10),
            reorg_lookback: 6,
        }
    }

    fn spend(n: usize) -> (OutpointRef, Transaction) {
        let input = make_inputs(n + 1, 1_000).remove(n);
        let tx = spend_of(
            input.outpoint,
            vec![bitcoin::TxOut {
                value: bitcoin::Amount::from_sat(900),
                script_pubkey: recipient_script(),
            }],
        );
        (input.outpoint_ref(), tx)
    }

    #[tokio::test]
    async fn test_follows_chain_and_emits() {
        let chain = Arc::new(MemChain::default());
        chain.push(vec![], 0);
        let watcher = Arc::new(OutpointWatcher::new(signer_secret(), 2).unwrap());
        let mut rx = watcher.subscribe();
        let (op, tx) = spend(0);
        watcher.watch(op);

        let mut follower = ChainFollower::new(chain.clone(), watcher.clone(), 0, config());
        assert!(follower.poll_once().await.unwrap().is_empty());
        assert!(follower.poll_once().await.unwrap().is_empty());

        chain.push(vec![tx], 0);
        assert!(follower.poll_once().await.unwrap().is_empty());
        chain.push(vec![], 0);
        let out = follower.poll_once().await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].outpoint(), op);
        assert_eq!(rx.recv().await.unwrap(), out[0]);
        assert_eq!(follower.next_height(), 3);
    }

    #[tokio::test]
    async fn test_reorg_reverts_pending_spend() {
        let chain = Arc::new(MemChain::default());
        chain.push(vec![], 0);
        chain.push(vec![], 0);
        let watcher = Arc::new(OutpointWatcher::new(signer_secret(), 3).unwrap());
        let (op, tx) = spend(1);
        watcher.watch(op);

        let mut follower = ChainFollower::new(chain.clone(), watcher.clone(), 0, config());
        follower.poll_once().await.unwrap();

        chain.push(vec![tx.clone()], 0);
        follower.poll_once().await.unwrap();
        assert!(!watcher.is_watched(&op));

        // Replace height 2 with a block that doesn't include the spend.
        chain.truncate(2);
        chain.push(vec![], 7);
        chain.push(vec![], 7);
        assert!(follower.poll_once().await.unwrap().is_empty());
        assert!(watcher.is_watched(&op));
        assert_eq!(watcher.num_pending(), 0);

        // Spend lands at height 4 and needs 3 confirmations.
        chain.push(vec![tx], 7);
        chain.push(vec![], 7);
        assert!(follower.poll_once().await.unwrap().is_empty());
        chain.push(vec![], 7);
        let out = follower.poll_once().await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].body.block_height, 4);
    }

    #[tokio::test]
    async fn test_backfill_replays_emitted() {
        let chain = Arc::new(MemChain::default());
        let watcher = Arc::new(OutpointWatcher::new(signer_secret(), 1).unwrap());
        let (op, tx) = spend(2);
        watcher.watch(op);
        chain.push(vec![], 0);
        chain.push(vec![tx], 0);

        let mut follower = ChainFollower::new(chain.clone(), watcher.clone(), 0, config());
        let live = follower.poll_once().await.unwrap();
        assert_eq!(live.len(), 1);

        let replayed = backfill(chain.as_ref(), &watcher, 0, 1).await.unwrap();
        assert_eq!(replayed, live);
    }
}
