// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{ElectionProof, Error, Ticket, TipsetKey};
use crate::shim::{
    address::Address,
    bigint::BigInt,
    clock::ChainEpoch,
    crypto::{Signature, SignatureType, verify_bls_sig},
};
use crate::utils::encoding::blake2b_256;
use cid::Cid;
use fvm_ipld_encoding::tuple::*;
use multihash_codetable::Code;
use multihash_derive::MultihashDigest as _;

#[derive(Deserialize_tuple, Serialize_tuple, Clone, Eq, PartialEq, Debug)]
pub struct RawBlockHeader {
    /// The address of the miner actor that mined this block
    pub miner_address: Address,
    pub ticket: Option<Ticket>,
    pub election_proof: Option<ElectionProof>,
    /// The set of parents this block was based on.
    /// Typically one, but can be several in the case where there were multiple
    /// winning ticket-holders for an epoch
    pub parents: TipsetKey,
    /// The aggregate chain weight of the parent set
    #[serde(with = "crate::shim::bigint::bigint_ser")]
    pub weight: BigInt,
    /// The period in which a new block is generated.
    /// There may be multiple rounds in an epoch.
    pub epoch: ChainEpoch,
    /// Block creation time, in seconds since the Unix epoch
    pub timestamp: u64,
    /// Signature of the miner's worker key over the rest of the header
    pub signature: Option<Signature>,
}

impl RawBlockHeader {
    pub fn car_block(&self) -> Result<(Cid, Vec<u8>), Error> {
        let data = fvm_ipld_encoding::to_vec(self).map_err(|e| Error::Encoding(e.to_string()))?;
        let cid = Cid::new_v1(fvm_ipld_encoding::DAG_CBOR, Code::Blake2b256.digest(&data));
        Ok((cid, data))
    }

    /// Serializes the header to bytes for signing purposes i.e. without the
    /// signature field
    pub fn signing_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut blk = self.clone();
        blk.signature = None;
        fvm_ipld_encoding::to_vec(&blk).map_err(|e| Error::Encoding(e.to_string()))
    }

    /// Check to ensure block signature is valid
    pub fn verify_signature_against(&self, addr: &Address) -> Result<(), Error> {
        let signature = self
            .signature
            .as_ref()
            .ok_or_else(|| Error::InvalidSignature("Signature is nil in header".to_owned()))?;
        if signature.sig_type != SignatureType::BLS {
            return Err(Error::InvalidSignature(format!(
                "unsupported signature type {:?}",
                signature.sig_type
            )));
        }

        verify_bls_sig(&signature.bytes, &self.signing_bytes()?, addr)
            .map_err(|e| Error::InvalidSignature(format!("Block signature invalid: {e}")))?;

        Ok(())
    }
}

/// A [`RawBlockHeader`] together with its content identifier, computed once at
/// construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachingBlockHeader {
    uncached: RawBlockHeader,
    cid: Cid,
}

impl std::ops::Deref for CachingBlockHeader {
    type Target = RawBlockHeader;

    fn deref(&self) -> &Self::Target {
        &self.uncached
    }
}

impl CachingBlockHeader {
    pub fn new(uncached: RawBlockHeader) -> Result<Self, Error> {
        let (cid, _) = uncached.car_block()?;
        Ok(Self { uncached, cid })
    }

    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    pub fn into_raw(self) -> RawBlockHeader {
        self.uncached
    }

    /// Blocks inside a tipset are ordered by ticket digest, then by CID bytes.
    pub(super) fn tipset_sort_key(&self) -> ([u8; 32], Vec<u8>) {
        let ticket_hash = self
            .ticket
            .as_ref()
            .map(|t| blake2b_256(t.vrfproof.as_bytes()))
            .unwrap_or_default();
        (ticket_hash, self.cid.to_bytes())
    }
}
