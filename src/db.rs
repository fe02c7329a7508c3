//! LMDB-backed credential store

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use byteorder::BigEndian;
use heed::types::{SerdeJson, Str, U64};
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};

use crate::constants::DEFAULT_VOCABULARY;
use crate::error::{err, Result, StoreError};
use crate::identity::{Identity, IdentityStatus, NewIdentity};
use crate::permissions::{PermissionInfo, PermissionSet, Vocabulary};
use crate::store::CredentialStore;

type IdentityDb = Database<U64<BigEndian>, SerdeJson<Identity>>;
type IndexDb = Database<Str, U64<BigEndian>>;
type TextDb = Database<Str, Str>;

/// All database handles
struct Dbs {
    /// id -> identity
    identities: IdentityDb,
    /// mobile number or lowercased email -> id
    identifiers: IndexDb,
    /// permission name -> description
    vocabulary: TextDb,
    /// counters and flags
    meta: TextDb,
}

const NEXT_ID: &str = "next_id";
const SEEDED: &str = "seeded";
const BOOT: &str = "boot";

/// Milliseconds since the Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// Emails are matched case-insensitively, mobile numbers exactly
fn index_key(identifier: &str) -> String {
    if identifier.contains('@') { identifier.to_ascii_lowercase() } else { identifier.to_string() }
}

pub struct LmdbStore {
    env: Env,
    dbs: Dbs,
}

impl LmdbStore {
    /// Open (or create) a store at `path`, seeding the built-in vocabulary on first open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(err)?;
        // SAFETY: LMDB requires no other processes access this path concurrently during open.
        let env = unsafe { EnvOpenOptions::new().map_size(1 << 30).max_dbs(4).open(path).map_err(err)? };
        let mut tx = env.write_txn().map_err(err)?;
        let dbs = Dbs {
            identities: env.create_database(&mut tx, Some("identities")).map_err(err)?,
            identifiers: env.create_database(&mut tx, Some("identifiers")).map_err(err)?,
            vocabulary: env.create_database(&mut tx, Some("vocabulary")).map_err(err)?,
            meta: env.create_database(&mut tx, Some("meta")).map_err(err)?,
        };
        if dbs.meta.get(&tx, SEEDED).map_err(err)?.is_none() {
            for (name, description) in DEFAULT_VOCABULARY {
                dbs.vocabulary.put(&mut tx, name, description).map_err(err)?;
            }
            dbs.meta.put(&mut tx, SEEDED, "1").map_err(err)?;
            tracing::info!(count = DEFAULT_VOCABULARY.len(), "seeded permission vocabulary");
        }
        tx.commit().map_err(err)?;
        Ok(Self { env, dbs })
    }

    fn read<T, F: FnOnce(&Dbs, &RoTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        f(&self.dbs, &self.env.read_txn().map_err(err)?)
    }

    fn write<T, F: FnOnce(&Dbs, &mut RwTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        let mut tx = self.env.write_txn().map_err(err)?;
        let r = f(&self.dbs, &mut tx)?;
        tx.commit().map_err(err)?;
        Ok(r)
    }

    /// Add or re-describe a grantable permission
    pub fn define_permission(&self, name: &str, description: Option<&str>) -> Result<()> {
        self.write(|d, tx| d.vocabulary.put(tx, name, description.unwrap_or("")).map_err(err))
    }

    /// Remove a permission from the vocabulary. Identities still holding it keep the
    /// orphaned value; it just can no longer be granted.
    pub fn remove_permission(&self, name: &str) -> Result<bool> {
        self.write(|d, tx| d.vocabulary.delete(tx, name).map_err(err))
    }

    pub fn is_bootstrapped(&self) -> Result<bool> {
        self.read(|d, tx| Ok(d.meta.get(tx, BOOT).map_err(err)?.is_some()))
    }

    /// Create the initial administrator holding `*`. Only ever succeeds once.
    pub fn bootstrap(&self, mut admin: NewIdentity) -> Result<Identity> {
        admin.status = IdentityStatus::Active;
        admin.permissions = PermissionSet::wildcard();
        self.write(|d, tx| {
            if d.meta.get(tx, BOOT).map_err(err)?.is_some() {
                return Err(StoreError::AlreadyBootstrapped);
            }
            let identity = insert(d, tx, admin)?;
            d.meta.put(tx, BOOT, &identity.id.to_string()).map_err(err)?;
            Ok(identity)
        })
    }
}

fn insert(d: &Dbs, tx: &mut RwTxn, new: NewIdentity) -> Result<Identity> {
    let mobile = index_key(&new.mobile_no);
    let email = index_key(&new.email);
    if d.identifiers.get(tx, &mobile).map_err(err)?.is_some() || d.identifiers.get(tx, &email).map_err(err)?.is_some() {
        return Err(StoreError::Conflict("Mobile No or Email".into()));
    }
    let id = match d.meta.get(tx, NEXT_ID).map_err(err)? {
        Some(s) => s.parse().map_err(|_| StoreError::Corrupted(format!("{} = {}", NEXT_ID, s)))?,
        None => 1u64,
    };
    d.meta.put(tx, NEXT_ID, &(id + 1).to_string()).map_err(err)?;

    let now = now_ms();
    let identity = Identity {
        id,
        name: new.name,
        email: new.email,
        mobile_no: new.mobile_no,
        secret_hash: new.secret_hash,
        image_url: None,
        status: new.status,
        permissions: new.permissions,
        created_at: now,
        updated_at: now,
    };
    d.identities.put(tx, &id, &identity).map_err(err)?;
    d.identifiers.put(tx, &mobile, &id).map_err(err)?;
    d.identifiers.put(tx, &email, &id).map_err(err)?;
    Ok(identity)
}

/// Read-modify-write of one identity inside a single write transaction
fn modify(d: &Dbs, tx: &mut RwTxn, id: u64, f: impl FnOnce(&mut Identity)) -> Result<bool> {
    let Some(mut identity) = d.identities.get(tx, &id).map_err(err)? else {
        return Ok(false);
    };
    f(&mut identity);
    identity.updated_at = now_ms();
    d.identities.put(tx, &id, &identity).map_err(err)?;
    Ok(true)
}

impl CredentialStore for LmdbStore {
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<Identity>> {
        self.read(|d, tx| match d.identifiers.get(tx, &index_key(identifier)).map_err(err)? {
            Some(id) => d.identities.get(tx, &id).map_err(err),
            None => Ok(None),
        })
    }

    fn find_by_id(&self, id: u64) -> Result<Option<Identity>> {
        self.read(|d, tx| d.identities.get(tx, &id).map_err(err))
    }

    fn update_permissions(&self, id: u64, permissions: &PermissionSet) -> Result<bool> {
        self.write(|d, tx| modify(d, tx, id, |i| i.permissions = permissions.clone()))
    }

    fn update_status(&self, id: u64, status: IdentityStatus) -> Result<bool> {
        self.write(|d, tx| modify(d, tx, id, |i| i.status = status))
    }

    fn create_identity(&self, new: NewIdentity) -> Result<Identity> {
        self.write(|d, tx| insert(d, tx, new))
    }

    fn list_identities(&self) -> Result<Vec<Identity>> {
        self.read(|d, tx| {
            let mut r = Vec::new();
            for item in d.identities.iter(tx).map_err(err)? {
                let (_, identity) = item.map_err(err)?;
                r.push(identity);
            }
            Ok(r)
        })
    }

    fn vocabulary(&self) -> Result<Vocabulary> {
        self.read(|d, tx| {
            let mut r = Vec::new();
            for item in d.vocabulary.iter(tx).map_err(err)? {
                let (name, description) = item.map_err(err)?;
                let description = (!description.is_empty()).then(|| description.to_string());
                r.push(PermissionInfo { name: name.to_string(), description });
            }
            Ok(r.into_iter().collect())
        })
    }
}
