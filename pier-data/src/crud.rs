use std::sync::Arc;

use dashmap::DashMap;

use crate::adapter::Adapter;
use crate::entity::{Entity, Key};
use crate::error::DataError;
use crate::page::{Page, Pagination};
use crate::query::{compile, compile_where, Condition, Conditions, Operator, QueryArgs};
use crate::record::Record;
use crate::repository::{Found, Repository};
use crate::value::Value;

/// Repository for one entity type over a shared adapter.
///
/// Keeps an identity cache of entities loaded by primary key. Bulk deletes
/// clear it; `save` and `delete_entity` keep it in step.
///
/// # Example
///
/// ```ignore
/// let options = DataManager::<ConfigOption>::new(adapter.clone())?;
/// let size = options
///     .find_one(&QueryArgs::new().where_eq("name", "max_upload_size"))
///     .await?;
/// ```
pub struct DataManager<E: Entity> {
    adapter: Arc<dyn Adapter>,
    cache: DashMap<String, E>,
}

impl<E: Entity> DataManager<E> {
    /// Create a manager after checking the entity's declared schema.
    pub fn new(adapter: Arc<dyn Adapter>) -> Result<Self, DataError> {
        validate_schema::<E>()?;
        Ok(Self {
            adapter,
            cache: DashMap::new(),
        })
    }

    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        &self.adapter
    }

    /// Escaped table name.
    pub fn table(&self) -> String {
        self.adapter.escape_identifier(E::table_name())
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    async fn load(&self, sql: &str) -> Result<Vec<E>, DataError> {
        let mut result = self.adapter.execute_query(sql).await?;
        let mut entities = Vec::with_capacity(result.row_count());
        while let Some(row) = result.fetch_row() {
            let record = Record::hydrate(&row, E::columns())?;
            let mut entity = E::from_record(&record)?;
            entity.set_new(false);
            entities.push(entity);
        }
        result.release();
        Ok(entities)
    }

    fn key_conditions(&self, key: &Key) -> Result<Conditions, DataError> {
        let pk = E::pk_columns();
        if key.values().len() != pk.len() {
            return Err(DataError::InvalidArgument(format!(
                "{} has {} primary key column(s), got {} value(s)",
                E::entity_name(),
                pk.len(),
                key.values().len()
            )));
        }
        if key.values().iter().any(Value::is_null) {
            return Err(DataError::InvalidArgument(format!(
                "{} primary key contains NULL",
                E::entity_name()
            )));
        }
        Ok(Conditions::All(
            pk.iter()
                .zip(key.values())
                .map(|(column, value)| Condition::new(column, Operator::Eq, value.clone()))
                .collect(),
        ))
    }

    fn where_for(&self, conditions: Option<&Conditions>) -> Result<String, DataError> {
        compile_where(conditions, E::columns(), self.adapter.dialect())
    }

    fn remember(&self, entity: &E) {
        self.cache.insert(entity.key().cache_key(), entity.clone());
    }

    async fn insert(&self, entity: &mut E) -> Result<(), DataError> {
        let mut record = entity.to_record();
        let auto = E::auto_increment_column();
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (name, value) in record.iter() {
            if E::column(name).is_none() || (Some(name) == auto && value.is_null()) {
                continue;
            }
            columns.push(self.adapter.escape_identifier(name));
            values.push(self.adapter.escape_value(value)?);
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table(),
            columns.join(", "),
            values.join(", ")
        );
        let result = self.adapter.execute_query(&sql).await?;

        if let Some(column) = auto {
            if record.value(column).map_or(true, Value::is_null) {
                let id = result
                    .last_insert_id()
                    .or_else(|| self.adapter.last_insert_id())
                    .ok_or_else(|| {
                        DataError::query(&sql, "backend reported no auto-increment value")
                    })?;
                record.set(column, id);
                *entity = E::from_record(&record)?;
            }
        }
        entity.set_new(false);
        tracing::debug!(entity = E::entity_name(), "Inserted entity");
        Ok(())
    }

    async fn update(&self, entity: &E) -> Result<(), DataError> {
        let record = entity.to_record();
        let pk = E::pk_columns();
        let mut assignments = Vec::new();
        for (name, value) in record.iter() {
            if E::column(name).is_none() || pk.iter().any(|p| *p == name) {
                continue;
            }
            assignments.push(format!(
                "{} = {}",
                self.adapter.escape_identifier(name),
                self.adapter.escape_value(value)?
            ));
        }
        if assignments.is_empty() {
            return Ok(());
        }
        let conditions = self.key_conditions(&entity.key())?;
        let sql = format!(
            "UPDATE {} SET {} {}",
            self.table(),
            assignments.join(", "),
            self.where_for(Some(&conditions))?
        );
        self.adapter.execute(&sql).await?;
        tracing::debug!(entity = E::entity_name(), "Updated entity");
        Ok(())
    }
}

fn validate_schema<E: Entity>() -> Result<(), DataError> {
    let columns = E::columns();
    if columns.is_empty() {
        return Err(DataError::InvalidArgument(format!(
            "{} declares no columns",
            E::entity_name()
        )));
    }
    if E::pk_columns().is_empty() {
        return Err(DataError::InvalidArgument(format!(
            "{} declares no primary key",
            E::entity_name()
        )));
    }
    let declared = |name: &str| columns.iter().any(|c| c.name == name);
    for name in E::pk_columns().iter().copied().chain(E::auto_increment_column()) {
        if !declared(name) {
            return Err(DataError::InvalidArgument(format!(
                "{} key column '{name}' is not a declared column",
                E::entity_name()
            )));
        }
    }
    Ok(())
}

impl<E: Entity> Repository<E> for DataManager<E> {
    async fn find(&self, args: &QueryArgs) -> Result<Found<E>, DataError> {
        let compiled = compile(args, E::columns(), E::pk_columns(), self.adapter.dialect())?;
        let entities = self.load(&compiled.select_sql(&self.table())).await?;
        Ok(if args.one {
            Found::One(entities.into_iter().next())
        } else {
            Found::Many(entities)
        })
    }

    async fn find_all(&self, args: &QueryArgs) -> Result<Vec<E>, DataError> {
        let args = QueryArgs {
            one: false,
            ..args.clone()
        };
        Ok(self.find(&args).await?.into_vec())
    }

    async fn find_one(&self, args: &QueryArgs) -> Result<Option<E>, DataError> {
        let args = QueryArgs {
            one: true,
            ..args.clone()
        };
        Ok(self.find(&args).await?.into_first())
    }

    async fn find_by_id(&self, key: &Key, force_reload: bool) -> Result<Option<E>, DataError> {
        let cache_key = key.cache_key();
        if !force_reload {
            if let Some(cached) = self.cache.get(&cache_key) {
                return Ok(Some(cached.value().clone()));
            }
        }
        let conditions = self.key_conditions(key)?;
        let found = self
            .find_one(&QueryArgs::new().conditions(conditions))
            .await?;
        match &found {
            Some(entity) => {
                self.cache.insert(cache_key, entity.clone());
            }
            None => {
                self.cache.remove(&cache_key);
            }
        }
        Ok(found)
    }

    async fn count(&self, conditions: Option<&Conditions>) -> Result<u64, DataError> {
        let mut sql = format!("SELECT COUNT(*) AS row_count FROM {}", self.table());
        let where_clause = self.where_for(conditions)?;
        if !where_clause.is_empty() {
            sql.push(' ');
            sql.push_str(&where_clause);
        }
        let row = self.adapter.execute_one(&sql).await?;
        let raw = row.as_ref().and_then(|r| r.get("row_count")).unwrap_or("0");
        raw.trim()
            .parse::<u64>()
            .map_err(|e| DataError::decode("row_count", e.to_string()))
    }

    async fn delete(&self, conditions: &Conditions) -> Result<bool, DataError> {
        let where_clause = self.where_for(Some(conditions))?;
        if where_clause.is_empty() {
            return Err(DataError::InvalidArgument(
                "delete requires conditions; use delete_all to empty the table".into(),
            ));
        }
        let sql = format!("DELETE FROM {} {where_clause}", self.table());
        let affected = self.adapter.execute(&sql).await?;
        self.cache.clear();
        Ok(affected > 0)
    }

    async fn delete_all(&self) -> Result<u64, DataError> {
        let sql = format!("DELETE FROM {}", self.table());
        let affected = self.adapter.execute(&sql).await?;
        self.cache.clear();
        tracing::debug!(entity = E::entity_name(), affected, "Deleted all rows");
        Ok(affected)
    }

    async fn paginate(
        &self,
        args: &QueryArgs,
        items_per_page: u64,
        current_page: u64,
    ) -> Result<Page<E>, DataError> {
        if items_per_page == 0 {
            return Err(DataError::InvalidArgument(
                "items per page must be at least 1".into(),
            ));
        }
        let total = self.count(args.conditions.as_ref()).await?;
        let pagination = Pagination::new(total, items_per_page, current_page)?;
        if total == 0 || pagination.is_out_of_range() {
            return Ok(Page::empty(pagination));
        }
        let limit = i64::try_from(pagination.limit())
            .map_err(|e| DataError::InvalidArgument(e.to_string()))?;
        let offset = i64::try_from(pagination.offset())
            .map_err(|e| DataError::InvalidArgument(e.to_string()))?;
        let paged = QueryArgs {
            one: false,
            limit: Some(limit),
            offset: Some(offset),
            ..args.clone()
        };
        let content = self.find_all(&paged).await?;
        Ok(Page::new(content, pagination))
    }

    async fn save(&self, entity: &mut E) -> Result<(), DataError> {
        if entity.is_new() {
            self.insert(entity).await?;
        } else {
            self.update(entity).await?;
        }
        self.remember(entity);
        Ok(())
    }

    async fn delete_entity(&self, entity: &E) -> Result<bool, DataError> {
        if entity.is_new() {
            return Ok(false);
        }
        let key = entity.key();
        let conditions = self.key_conditions(&key)?;
        let sql = format!(
            "DELETE FROM {} {}",
            self.table(),
            self.where_for(Some(&conditions))?
        );
        let affected = self.adapter.execute(&sql).await?;
        self.cache.remove(&key.cache_key());
        Ok(affected > 0)
    }

    async fn reload(&self, entity: &mut E) -> Result<(), DataError> {
        let key = entity.key();
        match self.find_by_id(&key, true).await? {
            Some(fresh) => {
                *entity = fresh;
                Ok(())
            }
            None => Err(DataError::NotFound(format!(
                "{} {}",
                E::entity_name(),
                key.cache_key()
            ))),
        }
    }
}


impl<E: Entity> std::fmt::Debug for DataManager<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataManager").finish_non_exhaustive()
    }
}
