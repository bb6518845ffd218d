//! HABTM proxy - symmetric many-to-many over id-arrays on both sides
//!
//! Unlike HasMany, the inverse side is also an array: attaching pushes the
//! parent id into the child's array (while `set_child` holds) and the child
//! id into the parent's array. Removal only ever unlinks - the child document
//! itself is never deleted through this proxy, whatever the dependent policy.

use serde_json::{json, Value};

use crate::context::RelationContext;
use crate::document::{Document, DocumentId};
use crate::error::{RelationError, RelationResult};
use crate::query::{merge_conditions, Query};
use crate::relationships::collection::{
    attach_child, ensure_allowed, forward_array_conditions, link_conditions, resolve_link,
    target_query, CollectionLink,
};
use crate::relationships::metadata::AssociationDeclaration;

/// Ephemeral accessor bound to one parent document and one habtm declaration
#[derive(Debug)]
pub struct Habtm<'a> {
    pub(crate) parent: &'a mut Document,
    pub(crate) declaration: AssociationDeclaration,
    pub(crate) ctx: &'a RelationContext,
}

impl<'a> Habtm<'a> {
    fn path(&self) -> &str {
        &self.declaration.path_name
    }

    fn should_set_child(&self) -> bool {
        self.declaration.set_child
    }

    /// Asymmetric habtm (`set_child: false`) has no inverse field and must
    /// never try to write one
    fn link(&self) -> RelationResult<Option<CollectionLink>> {
        if !self.should_set_child() {
            return Ok(None);
        }
        resolve_link(self.ctx, &self.declaration, self.parent.model()).map(Some)
    }

    /// Instantiate an unsaved child linked on both sides, in memory only
    pub fn build(&mut self, attrs: Value) -> RelationResult<Document> {
        let link = self.link()?;
        let mut child = self
            .ctx
            .build_document(&self.declaration.target_model, attrs)?;
        if let Some(link) = &link {
            attach_child(&mut child, link, self.parent.id(), self.parent.model());
        }
        let path = self.path().to_string();
        self.parent.push_reference(&path, child.id());
        Ok(child)
    }

    pub fn build_many(&mut self, attrs: Vec<Value>) -> RelationResult<Vec<Document>> {
        attrs.into_iter().map(|a| self.build(a)).collect()
    }

    /// Build and persist one child, then persist the parent
    pub async fn create(&mut self, attrs: Value) -> RelationResult<Document> {
        let mut child = self.build(attrs)?;
        self.ctx.save(&mut child).await?;
        self.ctx.save(self.parent).await?;
        Ok(child)
    }

    /// Build all children, save them sequentially (first error aborts, prior
    /// saves stay), then save the parent once
    pub async fn create_many(&mut self, attrs: Vec<Value>) -> RelationResult<Vec<Document>> {
        let mut children = self.build_many(attrs)?;
        for child in children.iter_mut() {
            self.ctx.save(child).await?;
        }
        self.ctx.save(self.parent).await?;
        Ok(children)
    }

    /// Link an already-instantiated child on both sides and persist it. The
    /// parent's array is updated in memory; the parent is not saved.
    pub async fn append(&mut self, child: &mut Document) -> RelationResult<()> {
        self.attach(child)?;
        self.ctx.save(child).await
    }

    fn attach(&mut self, child: &mut Document) -> RelationResult<()> {
        let link = self.link()?;
        ensure_allowed(self.ctx, &self.declaration.target_model, child.model())?;
        if let Some(link) = &link {
            attach_child(child, link, self.parent.id(), self.parent.model());
        }
        let path = self.path().to_string();
        self.parent.push_reference(&path, child.id());
        Ok(())
    }

    /// Batch `append`: children saved sequentially, the parent's array
    /// updated once and marked modified. The parent is not saved.
    pub async fn concat(&mut self, children: &mut [Document]) -> RelationResult<()> {
        let link = self.link()?;
        for child in children.iter_mut() {
            ensure_allowed(self.ctx, &self.declaration.target_model, child.model())?;
            if let Some(link) = &link {
                attach_child(child, link, self.parent.id(), self.parent.model());
            }
        }
        for child in children.iter_mut() {
            self.ctx.save(child).await?;
        }
        let path = self.path().to_string();
        for child in children.iter() {
            self.parent.push_reference(&path, child.id());
        }
        self.parent.mark_modified(&path);
        Ok(())
    }

    /// Lazy query over the children: always constrained to the parent's
    /// forward array, and by array-membership on the child side while
    /// `set_child` holds
    pub fn find(&self, conditions: Option<Value>) -> RelationResult<Query> {
        let mut safe = match self.link()? {
            Some(link) => link_conditions(&link, self.parent.id(), self.parent.model()),
            None => json!({}),
        };
        if let Some(caller) = conditions {
            merge_conditions(&mut safe, &caller);
        }
        merge_conditions(&mut safe, &forward_array_conditions(self.parent, self.path()));
        Ok(target_query(self.ctx, &self.declaration)?.filter(&safe))
    }

    pub async fn find_one(&self, conditions: Option<Value>) -> RelationResult<Option<Document>> {
        self.find(conditions)?.find_one().await
    }

    /// Unlink a member: drop its id from the parent's in-memory array and -
    /// under any dependent policy, while `set_child` holds - pull the parent
    /// id out of the child's array and save the child. The child document is
    /// never deleted; the parent is left for the caller to save.
    pub async fn remove(&mut self, id: DocumentId) -> RelationResult<()> {
        let path = self.path().to_string();
        if !self.parent.contains_reference(&path, id) {
            return Err(RelationError::NotAMember(
                "Child is not a member of the relationship.".to_string(),
            ));
        }
        self.parent.pull_reference(&path, id);

        if self.declaration.dependent.is_some() {
            if let Some(link) = self.link()? {
                let mut child = self
                    .ctx
                    .find_by_id(&self.declaration.target_model, id)
                    .await?
                    .ok_or_else(|| {
                        RelationError::NotFound(format!("child document {} no longer exists", id))
                    })?;
                child.pull_reference(&link.field_name, self.parent.id());
                self.ctx.save(&mut child).await?;
            }
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

    /// Re-fetch the parent and resolve the referenced children in array order
    pub async fn populate(&self) -> RelationResult<(Document, Vec<Document>)> {
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
