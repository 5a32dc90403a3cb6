//! Statement shapes produced the way entity repositories compose them.
//!
//! Each repository owns a filter type and turns it into a bracket; a query
//! across related entities merges the brackets of every repository involved.

use pgstmt::{FilterBracket, Join, QueryBuilder, StmtError, Value, args};

// ============================================
// Repository filters
// ============================================

#[derive(Default)]
struct CountryFilter {
    codes: Option<Vec<&'static str>>,
    name: Option<&'static str>,
}

impl CountryFilter {
    fn bracket(&self) -> FilterBracket {
        let mut b = FilterBracket::and();
        b.in_opt("countries.code", self.codes.clone())
            .ilike_opt("countries.name", self.name.map(|n| format!("%{n}%")));
        b
    }
}

#[derive(Default)]
struct AddressFilter {
    city: Option<&'static str>,
    search: Option<&'static str>,
}

impl AddressFilter {
    fn bracket(&self) -> FilterBracket {
        let mut b = FilterBracket::and();
        b.eq_opt("addresses.city", self.city);
        if let Some(term) = self.search {
            b.multi_ilike(&["addresses.street", "addresses.zip"], format!("%{term}%"));
        }
        b
    }
}

fn list_addresses(country: &CountryFilter, address: &AddressFilter) -> QueryBuilder {
    let mut qb = QueryBuilder::select_from("addresses");
    qb.select(&["addresses.*"])
        .join(Join::inner("countries", "countries").on_col("id", "addresses.country_id"))
        .where_bracket(country.bracket())
        .where_bracket(address.bracket())
        .order_by("addresses.id");
    qb
}

// ============================================
// Tests
// ============================================

#[test]
fn merged_filters_keep_merge_order() {
    let country = CountryFilter {
        codes: Some(vec!["NL", "BE"]),
        name: None,
    };
    let address = AddressFilter {
        city: Some("Delft"),
        search: Some("oude"),
    };

    let stmt = list_addresses(&country, &address).generate_sql().unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT addresses.* FROM addresses \
         INNER JOIN countries AS countries ON countries.id = addresses.country_id \
         WHERE countries.code IN ($1, $2) \
         AND (addresses.city = $3 AND (addresses.street ILIKE $4 OR addresses.zip ILIKE $5)) \
         ORDER BY addresses.id"
    );
    assert_eq!(
        stmt.args,
        args!["NL", "BE", "Delft", "%oude%", "%oude%"]
    );
}

#[test]
fn empty_filters_add_no_where() {
    let stmt = list_addresses(&CountryFilter::default(), &AddressFilter::default())
        .generate_sql()
        .unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT addresses.* FROM addresses \
         INNER JOIN countries AS countries ON countries.id = addresses.country_id \
         ORDER BY addresses.id"
    );
    assert!(stmt.args.is_empty());
}

#[test]
fn bank_with_three_contact_slots() {
    let slots = [
        ("pc", "primary_contact_id"),
        ("sc", "secondary_contact_id"),
        ("bc", "billing_contact_id"),
    ];

    let mut qb = QueryBuilder::select_from("banks");
    qb.with_alias("b").select(&["b.id", "b.name"]);
    for (alias, fk) in slots {
        let join = Join::left("contacts", alias).on_col("id", &format!("b.{fk}"));
        qb.select(&join.select_cols(&["email"]));
        qb.join(join);
    }
    qb.where_eq("b.id", 42_i64);

    let stmt = qb.generate_sql().unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT b.id, b.name, pc.email AS pc_email, sc.email AS sc_email, bc.email AS bc_email \
         FROM banks AS b \
         LEFT JOIN contacts AS pc ON pc.id = b.primary_contact_id \
         LEFT JOIN contacts AS sc ON sc.id = b.secondary_contact_id \
         LEFT JOIN contacts AS bc ON bc.id = b.billing_contact_id \
         WHERE b.id = $1"
    );
    assert_eq!(stmt.selection.as_str(), "b.id = 42");
}

#[test]
fn branch_upsert_by_code() {
    let mut qb = QueryBuilder::insert_into("bank_branches");
    qb.set_insert_fields(&["bank_id", "code", "city"])
        .set_insert_values(args![1, "UT01", "Utrecht"])
        .unwrap()
        .set_insert_values(args![1, "AM02", "Amsterdam"])
        .unwrap();
    qb.on_conflict(&["code"])
        .set_excluded("city")
        .set_update("updated_at", Some(Value::raw("NOW()")))
        .set_return_fields(&["id", "code"]);

    let stmt = qb.generate_sql().unwrap();
    assert_eq!(
        stmt.sql,
        "INSERT INTO bank_branches (bank_id, code, city) VALUES ($1, $2, $3), ($4, $5, $6) \
         ON CONFLICT (code) DO UPDATE SET city = EXCLUDED.city, updated_at = NOW() \
         RETURNING id, code"
    );
    assert_eq!(stmt.args.len(), 6);
    assert_eq!(stmt.selection.as_str(), "code = \"UT01\"");
}

#[test]
fn preferences_bulk_replace_from_json() {
    let payload = serde_json::json!([
        { "key": "theme", "value": "dark" },
        { "key": "lang", "value": "nl" },
    ]);

    let mut qb = QueryBuilder::update_table("user_preferences");
    qb.update_from_json_rows(payload.clone(), "src", &[("key", "text"), ("value", "text")])
        .set_from_column("value")
        .set_update("updated_at", Some(Value::raw("NOW()")))
        .where_eq("user_preferences.user_id", 9)
        .where_("user_preferences.key = src.key", vec![])
        .set_return_fields(&["user_preferences.key"]);

    let stmt = qb.generate_sql().unwrap();
    assert_eq!(
        stmt.sql,
        "UPDATE user_preferences SET value = src.value, updated_at = NOW() \
         FROM jsonb_to_recordset($1) AS src(key text, value text) \
         WHERE user_preferences.user_id = $2 AND user_preferences.key = src.key \
         RETURNING user_preferences.key"
    );
    assert_eq!(stmt.args, vec![Value::Json(payload), Value::Int(9)]);
}

#[test]
fn partial_update_with_nothing_set_is_rejected() {
    let name: Option<String> = None;
    let swift: Option<String> = None;

    let mut qb = QueryBuilder::update_table("banks");
    qb.set_update_opt("name", name)
        .set_update_opt("swift", swift)
        .where_eq("id", 1);

    assert!(!qb.is_updatable());
    let err = qb.generate_sql().unwrap_err();
    assert!(err.is_construction());
    assert!(matches!(err, StmtError::NothingToUpdate));
}

#[test]
fn ledger_documents_page() {
    let mut status = FilterBracket::or();
    status.eq("documents.status", "draft").is_null("documents.status");

    let mut qb = QueryBuilder::select_from("documents");
    qb.select(&["documents.id", "documents.title"])
        .where_eq("documents.ledger_id", 3)
        .where_bracket(status)
        .order_by("documents.created_at DESC")
        .paginate(2, 10);

    let stmt = qb.generate_sql().unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT documents.id, documents.title FROM documents \
         WHERE documents.ledger_id = $1 AND (documents.status = $2 OR documents.status IS NULL) \
         ORDER BY documents.created_at DESC LIMIT 10 OFFSET 10"
    );
    assert_eq!(
        stmt.selection.as_str(),
        "documents.ledger_id = 3 AND (documents.status = \"draft\" OR documents.status IS NULL)"
    );
}
