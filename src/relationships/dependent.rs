//! Dependency enforcer
//!
//! A declaration carrying a `dependent` policy installs a pre-remove hook on
//! the declaring schema. The hook runs through `RelationContext::remove`,
//! exactly once per removal, before the store-level delete, and applies the
//! policy to the children still attached at that moment.

use std::sync::Arc;

use crate::context::RelationContext;
use crate::document::Document;
use crate::error::RelationResult;
use crate::relationships::collection::{link_conditions, resolve_link};
use crate::relationships::metadata::{
    AssociationDeclaration, DependentPolicy, RelationshipKind,
};
use crate::schema::schema::{PreRemoveHook, Schema};
use crate::store::UpdateOp;

/// Wire the declaration's policy into the schema's pre-remove pipeline
pub(crate) fn install_dependent_hook(schema: &mut Schema, declaration: &AssociationDeclaration) {
    let declaration = declaration.clone();
    let hook: PreRemoveHook = Arc::new(move |document, ctx| {
        let declaration = declaration.clone();
        Box::pin(async move { enforce(&declaration, document, ctx).await })
    });
    schema.pre_remove(hook);
}

async fn enforce(
    declaration: &AssociationDeclaration,
    parent: &Document,
    ctx: &RelationContext,
) -> RelationResult<()> {
    let policy = match declaration.dependent {
        Some(policy) => policy,
        None => return Ok(()),
    };

    match declaration.kind {
        RelationshipKind::Habtm => unlink_all(declaration, parent, ctx).await,
        RelationshipKind::HasMany | RelationshipKind::HasOne => {
            apply_policy(declaration, policy, parent, ctx).await
        }
        // no child side to act on
        RelationshipKind::BelongsTo => Ok(()),
    }
}

async fn apply_policy(
    declaration: &AssociationDeclaration,
    policy: DependentPolicy,
    parent: &Document,
    ctx: &RelationContext,
) -> RelationResult<()> {
    let link = resolve_link(ctx, declaration, parent.model())?;
    let conditions = link_conditions(&link, parent.id(), parent.model());
    let collection = ctx.registry().collection_of(&declaration.target_model)?;

    match policy {
        DependentPolicy::Destroy => {
            let children = ctx
                .query(&declaration.target_model)?
                .filter(&conditions)
                .exec()
                .await?;
            tracing::debug!(
                parent = %parent.model(),
                target = %declaration.target_model,
                count = children.len(),
                "destroying dependent children"
            );
            for child in &children {
                ctx.remove(child).await?;
            }
        }
        DependentPolicy::Delete => {
            let removed = ctx.store().delete_many(&collection, &conditions).await?;
            tracing::debug!(
                parent = %parent.model(),
                target = %declaration.target_model,
                count = removed,
                "deleted dependent children"
            );
        }
        DependentPolicy::Nullify => {
            let mut fields = vec![link.field_name.clone()];
            if let Some(type_field) = &link.type_field {
                fields.push(type_field.clone());
            }
            let updated = ctx
                .store()
                .update_many(&collection, &conditions, &UpdateOp::Unset(fields))
                .await?;
            tracing::debug!(
                parent = %parent.model(),
                target = %declaration.target_model,
                count = updated,
                "nullified dependent children"
            );
        }
    }
    Ok(())
}

// Habtm cascades are symmetric unlinking regardless of the concrete policy:
// pull the doomed parent's id out of every child's array and save each child.
async fn unlink_all(
    declaration: &AssociationDeclaration,
    parent: &Document,
    ctx: &RelationContext,
) -> RelationResult<()> {
    if !declaration.set_child {
        return Ok(());
    }
    let link = resolve_link(ctx, declaration, parent.model())?;
    let conditions = link_conditions(&link, parent.id(), parent.model());
    let mut children = ctx
        .query(&declaration.target_model)?
        .filter(&conditions)
        .exec()
        .await?;
    tracing::debug!(
        parent = %parent.model(),
        target = %declaration.target_model,
        count = children.len(),
        "unlinking habtm children"
    );
    for child in children.iter_mut() {
        child.pull_reference(&link.field_name, parent.id());
        ctx.save(child).await?;
    }
    Ok(())
}
