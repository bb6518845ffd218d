//! HasMany proxy - parent-side collection accessor
//!
//! Children store the reverse foreign key (a scalar, or the `<as>`/`<as>_type`
//! pair for polymorphic linkage); the parent optionally keeps a forward
//! id-array kept in sync while `set_parent` holds. Finds double-filter by
//! both the inverse key and the forward array, guarding against drift.
//!
//! Multi-child operations run sequentially; the first error aborts remaining
//! work and nothing already persisted is rolled back.

use serde_json::{json, Value};

use crate::context::RelationContext;
use crate::document::{Document, DocumentId};
use crate::error::{RelationError, RelationResult};
use crate::query::{merge_conditions, Query};
use crate::relationships::collection::{
    attach_child, detach_child, ensure_allowed, forward_array_conditions, link_conditions,
    resolve_link, target_query, CollectionLink,
};
use crate::relationships::metadata::{AssociationDeclaration, DependentPolicy};

/// Ephemeral accessor bound to one parent document and one declared
/// association; rebuilt per access, never cached
#[derive(Debug)]
pub struct HasMany<'a> {
    pub(crate) parent: &'a mut Document,
    pub(crate) declaration: AssociationDeclaration,
    pub(crate) ctx: &'a RelationContext,
}

impl<'a> HasMany<'a> {
    fn path(&self) -> &str {
        &self.declaration.path_name
    }

    fn should_set_parent(&self) -> bool {
        self.declaration.set_parent
    }

    fn link(&self) -> RelationResult<CollectionLink> {
        resolve_link(self.ctx, &self.declaration, self.parent.model())
    }

    /// Instantiate an unsaved child associated with the parent. The parent's
    /// forward array is updated in memory only.
    pub fn build(&mut self, attrs: Value) -> RelationResult<Document> {
        let link = self.link()?;
        let mut child = self
            .ctx
            .build_document(&self.declaration.target_model, attrs)?;
        attach_child(&mut child, &link, self.parent.id(), self.parent.model());
        if self.should_set_parent() {
            let path = self.path().to_string();
            self.parent.push_reference(&path, child.id());
        }
        Ok(child)
    }

    /// `build` for each element, in order
    pub fn build_many(&mut self, attrs: Vec<Value>) -> RelationResult<Vec<Document>> {
        attrs.into_iter().map(|a| self.build(a)).collect()
    }

    /// Build and persist one child, then persist the parent when its forward
    /// array is maintained
    pub async fn create(&mut self, attrs: Value) -> RelationResult<Document> {
        let mut child = self.build(attrs)?;
        self.ctx.save(&mut child).await?;
        if self.should_set_parent() {
            self.ctx.save(self.parent).await?;
        }
        Ok(child)
    }

    /// Build all children, save them sequentially (first error aborts, prior
    /// saves stay), then save the parent once
    pub async fn create_many(&mut self, attrs: Vec<Value>) -> RelationResult<Vec<Document>> {
        let mut children = self.build_many(attrs)?;
        for child in children.iter_mut() {
            self.ctx.save(child).await?;
        }
        if self.should_set_parent() {
            self.ctx.save(self.parent).await?;
        }
        Ok(children)
    }

    /// Associate an already-instantiated child and persist it. The parent's
    /// forward array is updated in memory; the parent is not saved.
    pub async fn append(&mut self, child: &mut Document) -> RelationResult<()> {
        self.attach(child)?;
        self.ctx.save(child).await
    }

    fn attach(&mut self, child: &mut Document) -> RelationResult<()> {
        let link = self.link()?;
        ensure_allowed(self.ctx, &self.declaration.target_model, child.model())?;
        attach_child(child, &link, self.parent.id(), self.parent.model());
        if self.should_set_parent() {
            let path = self.path().to_string();
            self.parent.push_reference(&path, child.id());
        }
        Ok(())
    }

    /// `append` semantics for a batch: children saved sequentially, the
    /// parent's array updated once and marked modified. The parent is not
    /// saved; callers batch further changes and save it themselves.
    pub async fn concat(&mut self, children: &mut [Document]) -> RelationResult<()> {
        let link = self.link()?;
        for child in children.iter_mut() {
            ensure_allowed(self.ctx, &self.declaration.target_model, child.model())?;
            attach_child(child, &link, self.parent.id(), self.parent.model());
        }
        for child in children.iter_mut() {
            self.ctx.save(child).await?;
        }
        if self.should_set_parent() {
            let path = self.path().to_string();
            for child in children.iter() {
                self.parent.push_reference(&path, child.id());
            }
            self.parent.mark_modified(&path);
        }
        Ok(())
    }

    /// Associate in memory only: sets the child's foreign key (and type
    /// sibling), touching neither the forward array nor the store
    pub fn push(&mut self, child: &mut Document) -> RelationResult<()> {
        let link = self.link()?;
        ensure_allowed(self.ctx, &self.declaration.target_model, child.model())?;
        attach_child(child, &link, self.parent.id(), self.parent.model());
        Ok(())
    }

    /// `push` for a batch, shape-preserving
    pub fn push_many(&mut self, children: &mut [Document]) -> RelationResult<()> {
        for child in children.iter_mut() {
            self.push(child)?;
        }
        Ok(())
    }

    /// Lazy query over the children, pre-filtered by the inverse key and -
    /// when the forward array is maintained - by membership in it
    pub fn find(&self, conditions: Option<Value>) -> RelationResult<Query> {
        let mut safe = link_conditions(&self.link()?, self.parent.id(), self.parent.model());
        if let Some(caller) = conditions {
            merge_conditions(&mut safe, &caller);
        }
        if self.should_set_parent() && self.declaration.as_field.is_none() {
            merge_conditions(&mut safe, &forward_array_conditions(self.parent, self.path()));
        }
        Ok(target_query(self.ctx, &self.declaration)?.filter(&safe))
    }

    /// First matching child, if any
    pub async fn find_one(&self, conditions: Option<Value>) -> RelationResult<Option<Document>> {
        self.find(conditions)?.find_one().await
    }

    /// Detach a member by id and apply the dependent policy to it.
    ///
    /// `Destroy` removes the child through its full removal lifecycle,
    /// `Delete` removes it directly at the store level, `Nullify` unsets its
    /// foreign key, and no policy leaves the child untouched. The parent is
    /// persisted afterwards when its forward array is maintained.
    pub async fn remove(&mut self, id: DocumentId) -> RelationResult<()> {
        let link = self.link()?;
        if self.should_set_parent() {
            let path = self.path().to_string();
            self.parent.pull_reference(&path, id);
        }

        let member = self
            .find(Some(json!({"_id": id.to_string()})))?
            .find_one()
            .await?;
        let mut child = member.ok_or_else(|| {
            RelationError::NotAMember("Child is not a member of the relationship.".to_string())
        })?;

        match self.declaration.dependent {
            Some(DependentPolicy::Destroy) => self.ctx.remove(&child).await?,
            Some(DependentPolicy::Delete) => {
                let collection = self.ctx.registry().collection_of(child.model())?;
                self.ctx.store().delete_by_id(&collection, child.id()).await?;
            }
            Some(DependentPolicy::Nullify) => {
                detach_child(&mut child, &link, self.parent.id());
                self.ctx.save(&mut child).await?;
            }
            None => {}
        }

        if self.should_set_parent() {
            self.ctx.save(self.parent).await?;
        }
        Ok(())
    }

    /// `remove` by document
    pub async fn remove_document(&mut self, child: &Document) -> RelationResult<()> {
        self.remove(child.id()).await
    }

    /// Alias for `remove`
    pub async fn delete(&mut self, id: DocumentId) -> RelationResult<()> {
        self.remove(id).await
    }

    /// Re-fetch the parent and resolve the referenced children in array
    /// order. Requires the forward array.
    pub async fn populate(&self) -> RelationResult<(Document, Vec<Document>)> {
        if !self.should_set_parent() {
            return Err(RelationError::Configuration(
                "Cannot populate when setParent is false. Use #find instead.".to_string(),
            ));
        }

        let fresh = self
            .ctx
            .find_by_id(self.parent.model(), self.parent.id())
            .await?
            .ok_or_else(|| {
                RelationError::NotFound(format!(
                    "parent document {} no longer exists",
                    self.parent.id()
                ))
            })?;

        let ids = fresh.reference_ids(self.path());
        let fetched = target_query(self.ctx, &self.declaration)?
            .filter(&forward_array_conditions(&fresh, self.path()))
            .exec()
            .await?;

        let children = ids
            .iter()
            .filter_map(|id| fetched.iter().find(|doc| doc.id() == *id).cloned())
            .collect();
        Ok((fresh, children))
    }
}
