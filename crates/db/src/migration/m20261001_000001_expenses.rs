//! Expense ledger migration.
//!
//! Creates the actor directory, the canonical expense records and their
//! detail projections, plus a deferred trigger that refuses to commit a
//! pair of rows that disagree on a mirrored field.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ENUMS_SQL).await?;
        db.execute_unprepared(ACTORS_SQL).await?;
        db.execute_unprepared(EXPENSE_RECORDS_SQL).await?;
        db.execute_unprepared(EXPENSE_DETAILS_SQL).await?;
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE record_type AS ENUM ('company_expense', 'contractor_expense');

CREATE TYPE approval_status AS ENUM ('pending', 'approved', 'auto_approved', 'rejected');

CREATE TYPE actor_role AS ENUM ('top_level_approver', 'financial_admin', 'member');
";

const ACTORS_SQL: &str = r"
CREATE TABLE actors (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email VARCHAR(255) NOT NULL UNIQUE,
    display_name VARCHAR(255) NOT NULL,
    role actor_role NOT NULL DEFAULT 'member',
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_actors_role ON actors(role) WHERE is_active;
";

const EXPENSE_RECORDS_SQL: &str = r"
CREATE TABLE expense_records (
    id UUID PRIMARY KEY,
    record_type record_type NOT NULL,
    title VARCHAR(255) NOT NULL,
    description TEXT,
    amount NUMERIC(19, 4) NOT NULL,
    category VARCHAR(100) NOT NULL,
    record_date DATE NOT NULL,
    approval_status approval_status NOT NULL,
    needs_approval BOOLEAN NOT NULL,
    created_by UUID NOT NULL REFERENCES actors(id),
    approved_by UUID REFERENCES actors(id),
    approved_at TIMESTAMPTZ,
    contractor_id UUID REFERENCES actors(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_expense_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_expense_contractor CHECK (
        (record_type = 'contractor_expense') = (contractor_id IS NOT NULL)
    ),
    CONSTRAINT chk_expense_approval_stamp CHECK (
        (approved_by IS NULL) = (approved_at IS NULL)
    )
);

-- Listing and summary filters
CREATE INDEX idx_expense_records_date ON expense_records(record_date DESC, id DESC);
CREATE INDEX idx_expense_records_status ON expense_records(approval_status, record_date DESC);
CREATE INDEX idx_expense_records_category ON expense_records(category, record_date DESC);
CREATE INDEX idx_expense_records_created_by ON expense_records(created_by);
";

const EXPENSE_DETAILS_SQL: &str = r"
CREATE TABLE expense_details (
    id UUID PRIMARY KEY,
    financial_record_id UUID NOT NULL UNIQUE REFERENCES expense_records(id) ON DELETE RESTRICT,
    title VARCHAR(255) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    category VARCHAR(100) NOT NULL,
    sub_category VARCHAR(100),
    expense_date DATE NOT NULL,
    expense_type VARCHAR(100),
    is_recurring BOOLEAN NOT NULL DEFAULT false,
    recurring_cycle VARCHAR(50),
    payment_method VARCHAR(100),
    invoice_number VARCHAR(100),
    receipt_url TEXT,
    attachment_urls JSONB NOT NULL DEFAULT '[]'::jsonb,
    tax_included BOOLEAN NOT NULL DEFAULT false,
    tax_rate NUMERIC(5, 2),
    approval_status approval_status NOT NULL,
    approved_by UUID REFERENCES actors(id),
    approved_at TIMESTAMPTZ,
    rejection_reason TEXT,
    edit_history JSONB NOT NULL DEFAULT '[]'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_detail_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_detail_tax_rate CHECK (tax_rate IS NULL OR (tax_rate >= 0 AND tax_rate <= 100)),
    CONSTRAINT chk_detail_recurring CHECK (NOT is_recurring OR recurring_cycle IS NOT NULL),
    CONSTRAINT chk_detail_history_array CHECK (jsonb_typeof(edit_history) = 'array')
);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: check_expense_mirror
-- Both rows of an expense must agree on the shared fields at commit
-- ============================================================
CREATE OR REPLACE FUNCTION check_expense_mirror()
RETURNS TRIGGER AS $$
DECLARE
    record_id UUID;
    mismatches INTEGER;
BEGIN
    IF TG_TABLE_NAME = 'expense_records' THEN
        record_id := NEW.id;
    ELSE
        record_id := NEW.financial_record_id;
    END IF;

    -- Deleted within the same transaction
    IF NOT EXISTS (SELECT 1 FROM expense_records WHERE id = record_id) THEN
        RETURN NEW;
    END IF;

    SELECT COUNT(*) INTO mismatches
    FROM expense_records r
    LEFT JOIN expense_details d ON d.financial_record_id = r.id
    WHERE r.id = record_id
      AND (
          d.id IS NULL
          OR r.title IS DISTINCT FROM d.title
          OR r.amount IS DISTINCT FROM d.amount
          OR r.category IS DISTINCT FROM d.category
          OR r.approval_status IS DISTINCT FROM d.approval_status
          OR r.approved_by IS DISTINCT FROM d.approved_by
          OR r.approved_at IS DISTINCT FROM d.approved_at
      );

    IF mismatches > 0 THEN
        RAISE EXCEPTION 'Expense % rows are not mirrored', record_id;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE CONSTRAINT TRIGGER trg_expense_records_mirror
AFTER INSERT OR UPDATE ON expense_records
DEFERRABLE INITIALLY DEFERRED
FOR EACH ROW
EXECUTE FUNCTION check_expense_mirror();

CREATE CONSTRAINT TRIGGER trg_expense_details_mirror
AFTER INSERT OR UPDATE ON expense_details
DEFERRABLE INITIALLY DEFERRED
FOR EACH ROW
EXECUTE FUNCTION check_expense_mirror();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_expense_details_mirror ON expense_details;
DROP TRIGGER IF EXISTS trg_expense_records_mirror ON expense_records;
DROP FUNCTION IF EXISTS check_expense_mirror();

DROP TABLE IF EXISTS expense_details CASCADE;
DROP TABLE IF EXISTS expense_records CASCADE;
DROP TABLE IF EXISTS actors CASCADE;

DROP TYPE IF EXISTS actor_role;
DROP TYPE IF EXISTS approval_status;
DROP TYPE IF EXISTS record_type;
";
