//! EVM transaction assembly.
//!
//! Builds the RLP signing payload and the signed raw bytes for legacy
//! (EIP-155) and EIP-1559 transactions. Access lists are not populated;
//! the 1559 encoding carries an empty list.

use primitive_types::{H160, U256};
use rlp::RlpStream;
use shared_crypto::{keccak256, RecoverableSignature};
use shared_types::{ErrorReason, TransactionCall, WalletError, WalletResult};

/// Which envelope a call resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Legacy,
    Eip1559,
}

/// A fully-resolved transaction ready to sign.
#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    pub kind: TxKind,
    pub chain_id: u64,
    pub nonce: U256,
    pub gas_limit: U256,
    pub to: Option<H160>,
    pub value: U256,
    pub data: Vec<u8>,
    /// Legacy only.
    pub gas_price: U256,
    /// 1559 only.
    pub max_fee_per_gas: U256,
    /// 1559 only.
    pub max_priority_fee_per_gas: U256,
}

impl PreparedTransaction {
    /// Build from a draft-resolved call. Fee fields decide the envelope:
    /// 1559 when `maxFeePerGas` is present, legacy otherwise.
    ///
    /// # Errors
    ///
    /// `invalid-params` when required fields are missing or malformed;
    /// the draft step should have resolved them all.
    pub fn from_call(call: &TransactionCall, chain_id: u64) -> WalletResult<Self> {
        let nonce = require_quantity("nonce", call.nonce.as_deref())?;
        let gas_limit = require_quantity("gas", call.gas.as_deref())?;
        let value = parse_quantity(call.value.as_deref().unwrap_or("0x0"))
            .ok_or_else(|| malformed("value"))?;
        let data = match call.data.as_deref() {
            Some(data) => parse_bytes(data).ok_or_else(|| malformed("data"))?,
            None => Vec::new(),
        };
        let to = match call.to.as_deref() {
            Some(to) => Some(parse_address(to)?),
            None => None,
        };

        if let Some(max_fee) = call.max_fee_per_gas.as_deref() {
            let max_fee_per_gas = parse_quantity(max_fee).ok_or_else(|| malformed("maxFeePerGas"))?;
            let max_priority_fee_per_gas = parse_quantity(
                call.max_priority_fee_per_gas.as_deref().unwrap_or("0x0"),
            )
            .ok_or_else(|| malformed("maxPriorityFeePerGas"))?;
            return Ok(Self {
                kind: TxKind::Eip1559,
                chain_id,
                nonce,
                gas_limit,
                to,
                value,
                data,
                gas_price: U256::zero(),
                max_fee_per_gas,
                max_priority_fee_per_gas,
            });
        }

        let gas_price = require_quantity("gasPrice", call.gas_price.as_deref())?;
        Ok(Self {
            kind: TxKind::Legacy,
            chain_id,
            nonce,
            gas_limit,
            to,
            value,
            data,
            gas_price,
            max_fee_per_gas: U256::zero(),
            max_priority_fee_per_gas: U256::zero(),
        })
    }

    /// The 32-byte digest the keyring signs.
    #[must_use]
    pub fn sighash(&self) -> [u8; 32] {
        match self.kind {
            TxKind::Legacy => {
                // EIP-155: rlp(nonce, gasPrice, gas, to, value, data,
                // chainId, 0, 0)
                let mut stream = RlpStream::new_list(9);
                self.encode_legacy_body(&mut stream);
                stream.append(&self.chain_id);
                stream.append(&0u8);
                stream.append(&0u8);
                keccak256(&stream.out())
            }
            TxKind::Eip1559 => {
                let mut stream = RlpStream::new_list(9);
                self.encode_1559_body(&mut stream);
                let mut payload = vec![0x02];
                payload.extend_from_slice(&stream.out());
                keccak256(&payload)
            }
        }
    }

    /// The signed raw transaction bytes for `eth_sendRawTransaction`.
    #[must_use]
    pub fn raw_signed(&self, signature: &RecoverableSignature) -> Vec<u8> {
        let r = U256::from_big_endian(&signature.r);
        let s = U256::from_big_endian(&signature.s);
        match self.kind {
            TxKind::Legacy => {
                let v = u64::from(signature.v) + self.chain_id * 2 + 35;
                let mut stream = RlpStream::new_list(9);
                self.encode_legacy_body(&mut stream);
                stream.append(&v);
                stream.append(&r);
                stream.append(&s);
                stream.out().to_vec()
            }
            TxKind::Eip1559 => {
                let mut stream = RlpStream::new_list(12);
                self.encode_1559_body(&mut stream);
                stream.append(&u64::from(signature.v));
                stream.append(&r);
                stream.append(&s);
                let mut payload = vec![0x02];
                payload.extend_from_slice(&stream.out());
                payload
            }
        }
    }

    /// The transaction hash of the signed bytes.
    #[must_use]
    pub fn hash_of(raw: &[u8]) -> String {
        format!("0x{}", hex::encode(keccak256(raw)))
    }

    fn encode_legacy_body(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&self.gas_price);
        stream.append(&self.gas_limit);
        self.encode_to(stream);
        stream.append(&self.value);
        stream.append(&self.data);
    }

    fn encode_1559_body(&self, stream: &mut RlpStream) {
        stream.append(&self.chain_id);
        stream.append(&self.nonce);
        stream.append(&self.max_priority_fee_per_gas);
        stream.append(&self.max_fee_per_gas);
        stream.append(&self.gas_limit);
        self.encode_to(stream);
        stream.append(&self.value);
        stream.append(&self.data);
        stream.begin_list(0); // access list
    }

    fn encode_to(&self, stream: &mut RlpStream) {
        match &self.to {
            Some(address) => stream.append(address),
            None => stream.append_empty_data(),
        };
    }
}

/// Parse a 0x-hex quantity into a U256.
#[must_use]
pub fn parse_quantity(raw: &str) -> Option<U256> {
    let body = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))?;
    if body.is_empty() {
        return None;
    }
    U256::from_str_radix(body, 16).ok()
}

fn parse_bytes(raw: &str) -> Option<Vec<u8>> {
    let body = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))?;
    hex::decode(body).ok()
}

fn parse_address(raw: &str) -> WalletResult<H160> {
    let canonical = shared_crypto::canonicalize_eth_address(raw).map_err(|_| {
        WalletError::new(ErrorReason::InvalidAddress, format!("invalid address {raw:?}"))
    })?;
    let bytes = hex::decode(&canonical[2..]).map_err(|_| malformed("address"))?;
    Ok(H160::from_slice(&bytes))
}

fn require_quantity(field: &str, value: Option<&str>) -> WalletResult<U256> {
    value
        .and_then(parse_quantity)
        .ok_or_else(|| malformed(field))
}

fn malformed(field: &str) -> WalletError {
    WalletError::invalid_params(format!("transaction field {field} is missing or malformed"))
}
