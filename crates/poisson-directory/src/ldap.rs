//! LDAP implementation of [`Directory`] using `ldap3`.
//!
//! Every call opens its own connection, does its work and unbinds. The
//! whole exchange runs under `DirectoryConfig::timeout`; when the deadline
//! hits, the future (and with it the connection handle) is dropped.

use std::collections::HashSet;
use std::future::Future;

use ldap3::exop::PasswordModify;
use ldap3::{
    Ldap, LdapConnAsync, LdapConnSettings, LdapError, Mod, Scope, SearchEntry,
    dn_escape, ldap_escape,
};
use poisson_protocol::{UserId, UserProfile, UserRole};

use crate::{Credentials, Directory, DirectoryConfig, DirectoryError};

/// `invalidCredentials` result code.
const RC_INVALID_CREDENTIALS: u32 = 49;

/// Attributes requested for every user search.
const USER_ATTRIBUTES: [&str; 11] = [
    "dn",
    "cn",
    "uid",
    "uidNumber",
    "givenName",
    "sn",
    "gecos",
    "mail",
    "description",
    "homeDirectory",
    "loginShell",
];

/// A [`Directory`] backed by an LDAP server.
#[derive(Debug, Clone)]
pub struct LdapDirectory {
    config: DirectoryConfig,
}

impl LdapDirectory {
    pub fn new(config: DirectoryConfig) -> Self {
        Self { config }
    }

    /// `uid=<uid>,<base dn>`, with the uid escaped for use in a DN.
    fn user_dn(&self, uid: &UserId) -> String {
        format!("uid={},{}", dn_escape(uid.as_str()), self.config.base_dn)
    }

    async fn connect(&self) -> Result<Ldap, DirectoryError> {
        let settings =
            LdapConnSettings::new().set_conn_timeout(self.config.timeout);
        let (conn, ldap) =
            LdapConnAsync::with_settings(settings, &self.config.url)
                .await
                .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::debug!(error = %e, "ldap connection driver stopped");
            }
        });

        Ok(ldap)
    }

    /// Runs `op` on a fresh connection and unbinds afterwards, whatever
    /// `op` returned.
    async fn with_connection<T, F, Fut>(
        &self,
        op: F,
    ) -> Result<T, DirectoryError>
    where
        F: FnOnce(Ldap) -> Fut,
        Fut: Future<Output = Result<T, DirectoryError>>,
    {
        let timeout = self.config.timeout;
        let work = async {
            let mut ldap = self.connect().await?;
            let result = op(ldap.clone()).await;
            if let Err(e) = ldap.unbind().await {
                tracing::debug!(error = %e, "ldap unbind failed");
            }
            result
        };

        tokio::time::timeout(timeout, work)
            .await
            .map_err(|_| DirectoryError::Timeout(timeout))?
    }

    async fn search(
        &self,
        ldap: &mut Ldap,
        filter: &str,
    ) -> Result<Vec<SearchEntry>, DirectoryError> {
        let (entries, _) = ldap
            .search(
                &self.config.base_dn,
                Scope::Subtree,
                filter,
                USER_ATTRIBUTES.to_vec(),
            )
            .await
            .map_err(classify)?
            .success()
            .map_err(classify)?;

        Ok(entries.into_iter().map(SearchEntry::construct).collect())
    }
}

impl Directory for LdapDirectory {
    async fn ping(&self) -> Result<(), DirectoryError> {
        self.with_connection(|_ldap| async { Ok(()) }).await
    }

    async fn bind(
        &self,
        credentials: &Credentials,
    ) -> Result<(), DirectoryError> {
        let dn = self.user_dn(credentials.uid());
        self.with_connection(|mut ldap| async move {
            simple_bind(&mut ldap, &dn, credentials.password()).await
        })
        .await
    }

    async fn find_user(
        &self,
        uid: &UserId,
    ) -> Result<UserProfile, DirectoryError> {
        let filter = format!("(uid={})", ldap_escape(uid.as_str()));
        let mut entries = self
            .with_connection(|mut ldap| async move {
                self.search(&mut ldap, &filter).await
            })
            .await?;

        match entries.len() {
            0 => Err(DirectoryError::NotFound(uid.clone())),
            1 => profile_from_entry(entries.remove(0)),
            count => Err(DirectoryError::Ambiguous {
                uid: uid.clone(),
                count,
            }),
        }
    }

    async fn list_users(&self) -> Result<Vec<UserProfile>, DirectoryError> {
        let entries = self
            .with_connection(|mut ldap| async move {
                self.search(&mut ldap, "(uid=*)").await
            })
            .await?;

        entries.into_iter().map(profile_from_entry).collect()
    }

    async fn modify(
        &self,
        credentials: &Credentials,
        attribute: &str,
        value: &str,
    ) -> Result<(), DirectoryError> {
        let dn = self.user_dn(credentials.uid());
        self.with_connection(|mut ldap| async move {
            simple_bind(&mut ldap, &dn, credentials.password()).await?;
            ldap.modify(&dn, vec![Mod::Replace(attribute, HashSet::from([value]))])
                .await
                .map_err(classify)?
                .success()
                .map_err(classify)?;
            Ok(())
        })
        .await
    }

    async fn change_password(
        &self,
        credentials: &Credentials,
        new_password: &str,
    ) -> Result<(), DirectoryError> {
        let dn = self.user_dn(credentials.uid());
        self.with_connection(|mut ldap| async move {
            simple_bind(&mut ldap, &dn, credentials.password()).await?;
            let exop = PasswordModify {
                user_id: Some(dn.as_str()),
                old_pass: Some(credentials.password()),
                new_pass: Some(new_password),
            };
            ldap.extended(exop)
                .await
                .map_err(classify)?
                .success()
                .map_err(classify)?;
            Ok(())
        })
        .await
    }
}

async fn simple_bind(
    ldap: &mut Ldap,
    dn: &str,
    password: &str,
) -> Result<(), DirectoryError> {
    ldap.simple_bind(dn, password)
        .await
        .map_err(classify)?
        .success()
        .map_err(classify)?;
    Ok(())
}

/// Sorts an `ldap3` error into our taxonomy: a rejected bind, a refused
/// operation (the server answered), or a transport problem.
fn classify(error: LdapError) -> DirectoryError {
    match error {
        LdapError::LdapResult { result }
            if result.rc == RC_INVALID_CREDENTIALS =>
        {
            DirectoryError::InvalidCredentials
        }
        LdapError::LdapResult { result } => DirectoryError::Operation(format!(
            "rc={} {}",
            result.rc, result.text
        )),
        other => DirectoryError::Unavailable(other.to_string()),
    }
}

fn profile_from_entry(entry: SearchEntry) -> Result<UserProfile, DirectoryError> {
    let first = |name: &str| {
        entry
            .attrs
            .get(name)
            .and_then(|values| values.first())
            .cloned()
            .unwrap_or_default()
    };

    let uid = first("uid");
    if uid.is_empty() {
        return Err(DirectoryError::MalformedEntry(format!(
            "{}: missing uid",
            entry.dn
        )));
    }

    let id = first("uidNumber").trim().parse::<u32>().map_err(|e| {
        DirectoryError::MalformedEntry(format!("{}: uidNumber: {e}", entry.dn))
    })?;

    Ok(UserProfile {
        username: UserId::new(uid),
        id,
        name: first("givenName"),
        surname: first("sn"),
        email: first("mail"),
        description: UserRole::from_description(&first("description")),
        full_name: first("gecos"),
    })
}
