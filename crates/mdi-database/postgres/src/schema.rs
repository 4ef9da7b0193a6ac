// Table definitions for one environment schema (dev_stock_data,
// test_stock_data, prod_stock_data all share this shape). Schema
// bootstrap happens outside this crate; the session search_path decides
// which environment a statement touches.

diesel::table! {
    exchanges (id) {
        id -> Int4,
        #[max_length = 10]
        code -> Varchar,
        name -> Text,
        #[max_length = 50]
        timezone -> Varchar,
        market_open -> Time,
        market_close -> Time,
    }
}

diesel::table! {
    instruments (id) {
        id -> Int4,
        #[max_length = 20]
        symbol -> Varchar,
        #[max_length = 10]
        kind -> Varchar,
        exchange_id -> Int4,
        #[max_length = 10]
        currency -> Varchar,
        is_active -> Bool,
        first_seen -> Nullable<Date>,
        last_seen -> Nullable<Date>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    daily_prices (id) {
        id -> Int8,
        instrument_id -> Int4,
        trading_date -> Date,
        open -> Float8,
        high -> Float8,
        low -> Float8,
        close -> Float8,
        volume -> Int8,
        #[max_length = 64]
        raw_hash -> Varchar,
        loaded_at -> Timestamptz,
    }
}

diesel::table! {
    etl_jobs (id) {
        id -> Int8,
        #[max_length = 100]
        job_name -> Varchar,
        #[max_length = 10]
        environment -> Varchar,
        #[max_length = 250]
        scheduler_run_id -> Nullable<Varchar>,
        started_at -> Timestamptz,
        finished_at -> Nullable<Timestamptz>,
        #[max_length = 20]
        status -> Varchar,
        records_processed -> Int4,
        records_inserted -> Int4,
        records_updated -> Int4,
        records_skipped -> Int4,
        records_failed -> Int4,
        quality_failed -> Int4,
        error_summary -> Nullable<Text>,
        metadata -> Nullable<Jsonb>,
    }
}

diesel::table! {
    etl_job_details (id) {
        id -> Int8,
        job_id -> Int8,
        instrument_id -> Int4,
        #[max_length = 10]
        operation -> Varchar,
        records_affected -> Int4,
        processing_ms -> Int8,
        error_text -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    quality_verdicts (id) {
        id -> Int8,
        job_id -> Int8,
        instrument_id -> Int4,
        #[max_length = 50]
        rule_name -> Varchar,
        metric_value -> Nullable<Float8>,
        min_threshold -> Nullable<Float8>,
        max_threshold -> Nullable<Float8>,
        is_valid -> Bool,
        #[max_length = 10]
        severity -> Varchar,
        checked_at -> Timestamptz,
    }
}

diesel::joinable!(instruments -> exchanges (exchange_id));
diesel::joinable!(daily_prices -> instruments (instrument_id));
diesel::joinable!(etl_job_details -> etl_jobs (job_id));
diesel::joinable!(etl_job_details -> instruments (instrument_id));
diesel::joinable!(quality_verdicts -> etl_jobs (job_id));
diesel::joinable!(quality_verdicts -> instruments (instrument_id));

diesel::allow_tables_to_appear_in_same_query!(
  exchanges,
  instruments,
  daily_prices,
  etl_jobs,
  etl_job_details,
  quality_verdicts,
);
