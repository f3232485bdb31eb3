//! # Catalogue
//!
//! Merchant accounts, properties, room types, fee schedules and room
//! templates with their physical rooms.
//!
//! ## Template Lifecycle
//! ```text
//! create_template(labels) ──► template + one EMPTY room per label
//!        │
//!        ▼
//! update_template(labels?) ──► pricing rewritten
//!        │                    removed labels deleted (unless busy after today)
//!        │                    new labels inserted
//!        ▼
//! retire_template ──► is_deleted = 1 (history keeps pointing at it)
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

use crate::engine::Engine;
use crate::error::EngineResult;
use innkeep_core::validation::{validate_billing, validate_name, validate_room_labels, validate_template};
use innkeep_core::{
    CoreError, FeeSchedule, MerchantAccount, PhysicalRoom, Property, RoomStatus, RoomTemplate, RoomType,
    TemplateDraft, ValidationError,
};
use innkeep_db::{InventoryRepository, MerchantRepository, RoomRepository};

/// A template together with its physical rooms.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateWithRooms {
    pub template: RoomTemplate,
    pub rooms: Vec<PhysicalRoom>,
}

async fn fetch_room_type(conn: &mut SqliteConnection, room_type_id: &str) -> EngineResult<RoomType> {
    RoomRepository::fetch_room_type(conn, room_type_id)
        .await?
        .ok_or_else(|| CoreError::not_found("RoomType", room_type_id).into())
}

/// Template capacity cannot exceed what the room type allows.
fn check_capacity(draft: &TemplateDraft, room_type: &RoomType) -> EngineResult<()> {
    if draft.max_guests > room_type.max_guests {
        return Err(ValidationError::OutOfRange {
            field: "max_guests".to_string(),
            min: 1,
            max: room_type.max_guests,
        }
        .into());
    }
    Ok(())
}

async fn insert_rooms<'a>(
    conn: &mut SqliteConnection,
    template_id: &str,
    labels: impl Iterator<Item = &'a str>,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    for label in labels {
        RoomRepository::insert_room(
            conn,
            &PhysicalRoom {
                id: Uuid::new_v4().to_string(),
                template_id: template_id.to_string(),
                label: label.to_string(),
                status: RoomStatus::Empty,
                created_at: now,
            },
        )
        .await?;
    }
    Ok(())
}

impl Engine {
    // =========================================================================
    // Accounts and properties
    // =========================================================================

    /// Opens a merchant account with a zero balance.
    pub async fn create_merchant_account(&self, title: &str) -> EngineResult<MerchantAccount> {
        validate_name("title", title)?;
        let now = self.now();
        let account = MerchantAccount {
            id: Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            balance_cents: 0,
            active_property_id: None,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.db().pool().acquire().await?;
        MerchantRepository::insert_account(&mut conn, &account).await?;

        info!(account_id = %account.id, title = %account.title, "Merchant account created");
        Ok(account)
    }

    pub async fn create_property(&self, account_id: &str, name: &str) -> EngineResult<Property> {
        validate_name("name", name)?;
        let property = Property {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            name: name.trim().to_string(),
            created_at: self.now(),
        };

        let mut tx = self.db().begin().await?;
        MerchantRepository::fetch_account(&mut tx, account_id)
            .await?
            .ok_or_else(|| CoreError::not_found("MerchantAccount", account_id))?;
        MerchantRepository::insert_property(&mut tx, &property).await?;
        tx.commit().await?;

        info!(property_id = %property.id, account_id = %account_id, "Property created");
        Ok(property)
    }

    /// Points the account's staff UI at one of its own properties.
    pub async fn set_active_property(&self, account_id: &str, property_id: &str) -> EngineResult<()> {
        let now = self.now();
        let mut tx = self.db().begin().await?;
        MerchantRepository::fetch_property(&mut tx, property_id)
            .await?
            .filter(|p| p.account_id == account_id)
            .ok_or_else(|| CoreError::not_found("Property", property_id))?;
        MerchantRepository::set_active_property(&mut tx, account_id, Some(property_id), now).await?;
        tx.commit().await?;

        info!(account_id = %account_id, property_id = %property_id, "Active property set");
        Ok(())
    }

    // =========================================================================
    // Room types and fees
    // =========================================================================

    pub async fn create_room_type(&self, name: &str, max_guests: i64) -> EngineResult<RoomType> {
        validate_name("name", name)?;
        if max_guests < 1 {
            return Err(ValidationError::MustBePositive {
                field: "max_guests".to_string(),
            }
            .into());
        }

        let room_type = RoomType {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            max_guests,
        };
        let mut conn = self.db().pool().acquire().await?;
        RoomRepository::insert_room_type(&mut conn, &room_type).await?;

        info!(room_type_id = %room_type.id, name = %room_type.name, "Room type created");
        Ok(room_type)
    }

    /// Sets the service fee charged per accepted line of a room type.
    pub async fn upsert_fee_schedule(&self, schedule: &FeeSchedule) -> EngineResult<()> {
        validate_billing("amount", schedule.unit, schedule.amount)?;
        validate_billing("resident_amount", schedule.resident_unit, schedule.resident_amount)?;

        let mut tx = self.db().begin().await?;
        fetch_room_type(&mut tx, &schedule.room_type_id).await?;
        RoomRepository::upsert_fee_schedule(&mut tx, schedule).await?;
        tx.commit().await?;

        info!(room_type_id = %schedule.room_type_id, unit = ?schedule.unit, amount = schedule.amount, "Fee schedule set");
        Ok(())
    }

    // =========================================================================
    // Templates
    // =========================================================================

    /// Creates a template and one EMPTY physical room per label.
    pub async fn create_template(
        &self,
        property_id: &str,
        draft: &TemplateDraft,
        room_labels: &[String],
    ) -> EngineResult<TemplateWithRooms> {
        validate_template(draft)?;
        validate_room_labels(room_labels)?;

        let now = self.now();
        let mut tx = self.db().begin().await?;

        MerchantRepository::fetch_property(&mut tx, property_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Property", property_id))?;
        let room_type = fetch_room_type(&mut tx, &draft.room_type_id).await?;
        check_capacity(draft, &room_type)?;

        let mut template = RoomTemplate {
            id: Uuid::new_v4().to_string(),
            property_id: property_id.to_string(),
            room_type_id: draft.room_type_id.clone(),
            name: draft.name.trim().to_string(),
            standard: draft.standard.clone(),
            resident: draft.resident.clone(),
            max_guests: draft.max_guests,
            max_children: draft.max_children,
            room_count: 0,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        RoomRepository::insert_template(&mut tx, &template).await?;
        insert_rooms(&mut tx, &template.id, room_labels.iter().map(|l| l.trim()), now).await?;
        template.room_count = RoomRepository::refresh_room_count(&mut tx, &template.id).await?;
        let rooms = RoomRepository::fetch_rooms(&mut tx, &template.id).await?;

        tx.commit().await?;

        info!(template_id = %template.id, property_id = %property_id, rooms = template.room_count, "Room template created");
        Ok(TemplateWithRooms { template, rooms })
    }

    /// Rewrites a template's pricing and capacity and, when `room_labels` is
    /// given, reconciles its physical rooms with that list.
    ///
    /// ## Errors
    /// * `RoomUnavailable` - a removed room holds a BUSY interval ending after today
    pub async fn update_template(
        &self,
        template_id: &str,
        draft: &TemplateDraft,
        room_labels: Option<&[String]>,
    ) -> EngineResult<TemplateWithRooms> {
        validate_template(draft)?;
        if let Some(labels) = room_labels {
            validate_room_labels(labels)?;
        }

        let now = self.now();
        let today = self.today();
        let mut tx = self.db().begin().await?;

        let existing = RoomRepository::fetch_template(&mut tx, template_id)
            .await?
            .filter(|t| !t.is_deleted)
            .ok_or_else(|| CoreError::not_found("RoomTemplate", template_id))?;
        let room_type = fetch_room_type(&mut tx, &draft.room_type_id).await?;
        check_capacity(draft, &room_type)?;

        let mut template = RoomTemplate {
            room_type_id: draft.room_type_id.clone(),
            name: draft.name.trim().to_string(),
            standard: draft.standard.clone(),
            resident: draft.resident.clone(),
            max_guests: draft.max_guests,
            max_children: draft.max_children,
            updated_at: now,
            ..existing
        };
        RoomRepository::update_template(&mut tx, &template).await?;

        if let Some(labels) = room_labels {
            let wanted: HashSet<&str> = labels.iter().map(|l| l.trim()).collect();
            let current = RoomRepository::fetch_rooms(&mut tx, template_id).await?;

            for room in current.iter().filter(|r| !wanted.contains(r.label.as_str())) {
                if InventoryRepository::has_busy_after(&mut tx, &room.id, today).await? {
                    return Err(CoreError::RoomUnavailable {
                        room_id: room.id.clone(),
                        from: today,
                        until: today.succ_opt().unwrap_or(today),
                    }
                    .into());
                }
                RoomRepository::delete_room(&mut tx, &room.id).await?;
            }

            let existing_labels: HashSet<&str> = current.iter().map(|r| r.label.as_str()).collect();
            let added = labels.iter().map(|l| l.trim()).filter(|l| !existing_labels.contains(l));
            insert_rooms(&mut tx, template_id, added, now).await?;
        }

        template.room_count = RoomRepository::refresh_room_count(&mut tx, template_id).await?;
        let rooms = RoomRepository::fetch_rooms(&mut tx, template_id).await?;
        tx.commit().await?;

        info!(template_id = %template_id, rooms = template.room_count, "Room template updated");
        Ok(TemplateWithRooms { template, rooms })
    }

    /// Soft-deletes a template. It can no longer be booked.
    pub async fn retire_template(&self, template_id: &str) -> EngineResult<()> {
        let now = self.now();
        let mut conn = self.db().pool().acquire().await?;
        RoomRepository::retire_template(&mut conn, template_id, now).await?;

        info!(template_id = %template_id, "Room template retired");
        Ok(())
    }

    /// Bookable templates of a property.
    pub async fn templates(&self, property_id: &str) -> EngineResult<Vec<RoomTemplate>> {
        Ok(self.db().rooms().list_templates(property_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fixtures::{date, double_room_draft, Fixture};

    fn labels(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_create_template_with_rooms() {
        let f = Fixture::new(0).await;
        let created = f
            .engine
            .create_template(&f.property_id, &double_room_draft(&f.room_type_id), &labels(&["B1", " B2 "]))
            .await
            .unwrap();

        assert_eq!(created.template.room_count, 2);
        let stored: Vec<_> = created.rooms.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(stored, ["B1", "B2"]);
        assert!(created.rooms.iter().all(|r| r.status == RoomStatus::Empty));
    }

    #[tokio::test]
    async fn test_create_template_validation() {
        let f = Fixture::new(0).await;

        let err = f
            .engine
            .create_template(&f.property_id, &double_room_draft(&f.room_type_id), &labels(&["B1", "B1"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.field().as_deref(), Some("room_label"));

        let mut draft = double_room_draft(&f.room_type_id);
        draft.max_guests = 3;
        let err = f
            .engine
            .create_template(&f.property_id, &draft, &labels(&["B1"]))
            .await
            .unwrap_err();
        assert_eq!(err.field().as_deref(), Some("max_guests"));

        let err = f
            .engine
            .create_template("missing", &double_room_draft(&f.room_type_id), &labels(&["B1"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecordNotFound);
    }

    #[tokio::test]
    async fn test_update_template_reconciles_rooms() {
        let f = Fixture::new(0).await;
        let mut draft = double_room_draft(&f.room_type_id);
        draft.standard.base_price_cents = 150;

        let updated = f
            .engine
            .update_template(&f.template_id, &draft, Some(&labels(&["A1", "A2", "C9"])))
            .await
            .unwrap();

        assert_eq!(updated.template.standard.base_price_cents, 150);
        assert_eq!(updated.template.room_count, 3);
        let stored: Vec<_> = updated.rooms.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(stored, ["A1", "A2", "C9"]);
    }

    #[tokio::test]
    async fn test_update_template_keeps_busy_room() {
        let f = Fixture::new(0).await;
        // A3 is blocked well after today.
        f.engine.block_room(&f.room_ids[2], date(7, 1), date(7, 3)).await.unwrap();

        let err = f
            .engine
            .update_template(&f.template_id, &double_room_draft(&f.room_type_id), Some(&labels(&["A1", "A2"])))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RoomUnavailable);

        let rooms = f.engine.db().rooms().list_rooms(&f.template_id).await.unwrap();
        assert_eq!(rooms.len(), 3);
    }

    #[tokio::test]
    async fn test_room_type_name_is_unique() {
        let f = Fixture::new(0).await;
        let err = f.engine.create_room_type("Double", 2).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PersistenceConstraintViolation);
        assert_eq!(err.field().as_deref(), Some("name"));
    }

    #[tokio::test]
    async fn test_active_property_must_belong_to_account() {
        let f = Fixture::new(0).await;
        let other = f.engine.create_merchant_account("Other Hotels").await.unwrap();
        let err = f.engine.set_active_property(&other.id, &f.property_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecordNotFound);
        assert_eq!(err.field().as_deref(), Some("property_id"));
    }

    #[tokio::test]
    async fn test_retired_template_is_hidden() {
        let f = Fixture::new(0).await;
        assert_eq!(f.engine.templates(&f.property_id).await.unwrap().len(), 1);
        f.engine.retire_template(&f.template_id).await.unwrap();
        assert!(f.engine.templates(&f.property_id).await.unwrap().is_empty());

        let err = f.engine.retire_template(&f.template_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecordNotFound);
    }
}
