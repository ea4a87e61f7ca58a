use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use shopkeeper_core::CompanyId;
use std::sync::Arc;

/// Company-isolated key/value store for disposable read models.
pub trait CompanyStore<K, V>: Send + Sync {
    fn get(&self, company_id: CompanyId, key: &K) -> Option<V>;
    fn upsert(&self, company_id: CompanyId, key: K, value: V);
    fn list(&self, company_id: CompanyId) -> Vec<V>;
    /// Drop every record (rebuild support).
    fn clear(&self);
}

impl<K, V, S> CompanyStore<K, V> for Arc<S>
where
    S: CompanyStore<K, V> + ?Sized,
{
    fn get(&self, company_id: CompanyId, key: &K) -> Option<V> {
        (**self).get(company_id, key)
    }

    fn upsert(&self, company_id: CompanyId, key: K, value: V) {
        (**self).upsert(company_id, key, value)
    }

    fn list(&self, company_id: CompanyId) -> Vec<V> {
        (**self).list(company_id)
    }

    fn clear(&self) {
        (**self).clear()
    }
}

/// In-memory company-isolated store.
#[derive(Debug)]
pub struct InMemoryCompanyStore<K, V> {
    inner: RwLock<HashMap<(CompanyId, K), V>>,
}

impl<K, V> InMemoryCompanyStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryCompanyStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> CompanyStore<K, V> for InMemoryCompanyStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, company_id: CompanyId, key: &K) -> Option<V> {
        let map = self.inner.read().ok()?;
        map.get(&(company_id, key.clone())).cloned()
    }

    fn upsert(&self, company_id: CompanyId, key: K, value: V) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((company_id, key), value);
        }
    }

    fn list(&self, company_id: CompanyId) -> Vec<V> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        map.iter()
            .filter_map(|((c, _k), v)| if *c == company_id { Some(v.clone()) } else { None })
            .collect()
    }

    fn clear(&self) {
        if let Ok(mut map) = self.inner.write() {
            map.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn companies_do_not_see_each_other() {
        let store = InMemoryCompanyStore::new();
        let (a, b) = (CompanyId::new(), CompanyId::new());
        store.upsert(a, "k", 1);
        store.upsert(b, "k", 2);

        assert_eq!(store.get(a, &"k"), Some(1));
        assert_eq!(store.list(b), vec![2]);
        assert_eq!(store.get(CompanyId::shared(), &"k"), None);

        store.clear();
        assert!(store.list(a).is_empty());
    }
}
