//! HasOne proxy - parent-side singular accessor
//!
//! The child carries the foreign key (or `<as>`/`<as>_type` pair); the owner
//! optionally keeps a singular forward reference while `set_parent` holds.
//! Find carries find-one semantics over the child collection.

use serde_json::Value;

use crate::context::RelationContext;
use crate::document::Document;
use crate::error::RelationResult;
use crate::query::Query;
use crate::relationships::collection::{
    attach_child, ensure_allowed, link_conditions, resolve_link, target_query, CollectionLink,
};
use crate::relationships::metadata::AssociationDeclaration;

/// Ephemeral accessor bound to one owner document and one hasOne declaration
#[derive(Debug)]
pub struct HasOne<'a> {
    pub(crate) owner: &'a mut Document,
    pub(crate) declaration: AssociationDeclaration,
    pub(crate) ctx: &'a RelationContext,
}

impl<'a> HasOne<'a> {
    fn path(&self) -> &str {
        &self.declaration.path_name
    }

    fn should_set_parent(&self) -> bool {
        self.declaration.set_parent
    }

    fn link(&self) -> RelationResult<CollectionLink> {
        resolve_link(self.ctx, &self.declaration, self.owner.model())
    }

    /// Instantiate an unsaved child pointing back at the owner. The owner's
    /// forward reference is set in memory only.
    pub fn build(&mut self, attrs: Value) -> RelationResult<Document> {
        let link = self.link()?;
        let mut child = self
            .ctx
            .build_document(&self.declaration.target_model, attrs)?;
        attach_child(&mut child, &link, self.owner.id(), self.owner.model());
        if self.should_set_parent() {
            let path = self.path().to_string();
            self.owner.set_reference(&path, child.id());
        }
        Ok(child)
    }

    /// Build and persist the child, then persist the owner when its forward
    /// reference is maintained
    pub async fn create(&mut self, attrs: Value) -> RelationResult<Document> {
        let mut child = self.build(attrs)?;
        self.ctx.save(&mut child).await?;
        if self.should_set_parent() {
            self.ctx.save(self.owner).await?;
        }
        Ok(child)
    }

    /// Associate an already-instantiated child in memory only: sets its
    /// foreign key (and type sibling) and the owner's forward reference
    pub fn push(&mut self, child: &mut Document) -> RelationResult<()> {
        let link = self.link()?;
        ensure_allowed(self.ctx, &self.declaration.target_model, child.model())?;
        attach_child(child, &link, self.owner.id(), self.owner.model());
        if self.should_set_parent() {
            let path = self.path().to_string();
            self.owner.set_reference(&path, child.id());
        }
        Ok(())
    }

    /// Lazy query pre-filtered by the child's foreign key
    pub fn find(&self) -> RelationResult<Query> {
        let safe = link_conditions(&self.link()?, self.owner.id(), self.owner.model());
        Ok(target_query(self.ctx, &self.declaration)?.filter(&safe))
    }

    /// The associated child, if one exists
    pub async fn find_one(&self) -> RelationResult<Option<Document>> {
        self.find()?.find_one().await
    }
}
