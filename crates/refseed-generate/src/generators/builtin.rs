use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};

use refseed_core::Column;

use crate::errors::SynthesisError;
use crate::generators::Generator;
use crate::generators::words::{FIRST_NAMES, LAST_NAMES};
use crate::value::{GeneratedValue, Value};

const TEXT_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const EMAIL_LOCAL_CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const PRINTABLE: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";
const PHONE_DIGITS: &[u8] = b"12345678";

const DEFAULT_TEXT_MIN: usize = 60;
const DEFAULT_TEXT_MAX: usize = 300;
const SMALLINT_MAX: i64 = 32_767;
const INTEGER_MAX: i64 = 2_147_483_646;
const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 20;
const SALT_BYTES: usize = 16;
/// `sha256$` + hex salt + `$` + hex SHA-256 digest.
const HASHED_PASSWORD_LEN: usize = 7 + 2 * SALT_BYTES + 1 + 64;

const TLDS: &[&str] = &["com", "net", "nl", "de", "co.uk"];
const COUNTRY_CODES: &[&str] = &["49", "53", "10", "11", "43"];

const DEFAULT_STAFF_TABLES: &[&str] = &["admin", "moderator"];
const DEFAULT_STAFF_DOMAIN: &str = "example";

/// Staff tables draw addresses from one organizational domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailPolicy {
    pub staff_tables: Vec<String>,
    pub staff_domain: String,
}

impl Default for EmailPolicy {
    fn default() -> Self {
        Self {
            staff_tables: DEFAULT_STAFF_TABLES.iter().map(|t| t.to_string()).collect(),
            staff_domain: DEFAULT_STAFF_DOMAIN.to_string(),
        }
    }
}

impl EmailPolicy {
    fn is_staff(&self, table: &str) -> bool {
        let bare = table.rsplit('.').next().unwrap_or(table);
        self.staff_tables
            .iter()
            .any(|staff| staff == table || staff == bare)
    }
}

/// Closed catalog of built-in generators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltinGenerator {
    Text,
    SmallInt,
    Integer,
    Boolean,
    Date,
    Timestamp,
    Uuid,
    FirstName,
    LastName,
    Email(EmailPolicy),
    Phone,
    Password,
}

impl BuiltinGenerator {
    pub const IDS: &'static [&'static str] = &[
        "builtin.text",
        "builtin.smallint",
        "builtin.integer",
        "builtin.boolean",
        "builtin.date",
        "builtin.timestamp",
        "builtin.uuid",
        "person.first_name",
        "person.last_name",
        "person.email",
        "person.phone",
        "person.password",
    ];

    /// Look up a built-in by id. `person.email` uses the given policy.
    pub fn from_id(id: &str, email: &EmailPolicy) -> Option<Self> {
        let generator = match id {
            "builtin.text" => Self::Text,
            "builtin.smallint" => Self::SmallInt,
            "builtin.integer" => Self::Integer,
            "builtin.boolean" => Self::Boolean,
            "builtin.date" => Self::Date,
            "builtin.timestamp" => Self::Timestamp,
            "builtin.uuid" => Self::Uuid,
            "person.first_name" => Self::FirstName,
            "person.last_name" => Self::LastName,
            "person.email" => Self::Email(email.clone()),
            "person.phone" => Self::Phone,
            "person.password" => Self::Password,
            _ => return None,
        };
        Some(generator)
    }
}

impl Generator for BuiltinGenerator {
    fn id(&self) -> &str {
        match self {
            Self::Text => "builtin.text",
            Self::SmallInt => "builtin.smallint",
            Self::Integer => "builtin.integer",
            Self::Boolean => "builtin.boolean",
            Self::Date => "builtin.date",
            Self::Timestamp => "builtin.timestamp",
            Self::Uuid => "builtin.uuid",
            Self::FirstName => "person.first_name",
            Self::LastName => "person.last_name",
            Self::Email(_) => "person.email",
            Self::Phone => "person.phone",
            Self::Password => "person.password",
        }
    }

    fn generate(
        &self,
        column: &Column,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, SynthesisError> {
        let value = match self {
            Self::Text => {
                let len = match column.max_length {
                    Some(max) if max > 0 => rng.random_range(1..=max as usize),
                    _ => rng.random_range(DEFAULT_TEXT_MIN..=DEFAULT_TEXT_MAX),
                };
                Value::Text(random_string(rng, TEXT_CHARSET, len))
            }
            Self::SmallInt => Value::Int(rng.random_range(1..=SMALLINT_MAX)),
            Self::Integer => Value::Int(rng.random_range(1..=INTEGER_MAX)),
            Self::Boolean => Value::Bool(rng.random_bool(0.5)),
            Self::Date => Value::Date(interpolate(rng).date()),
            Self::Timestamp => Value::Timestamp(interpolate(rng)),
            Self::Uuid => {
                let mut bytes = [0u8; 16];
                rng.fill_bytes(&mut bytes);
                Value::Uuid(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string())
            }
            Self::FirstName => Value::Text(pick_name(rng, FIRST_NAMES)),
            Self::LastName => Value::Text(pick_name(rng, LAST_NAMES)),
            Self::Email(policy) => Value::Text(email(rng, policy, &column.table)),
            Self::Phone => {
                let country = COUNTRY_CODES.choose(rng).copied().unwrap_or("49");
                Value::Text(format!("+{country} {}", random_string(rng, PHONE_DIGITS, 12)))
            }
            Self::Password => {
                if let Some(max) = column.max_length {
                    if (max as usize) < HASHED_PASSWORD_LEN {
                        return Err(SynthesisError::Configuration(format!(
                            "{} holds {max} characters but hashed passwords need {HASHED_PASSWORD_LEN}",
                            column.qualified_name()
                        )));
                    }
                }
                return Ok(password(rng));
            }
        };
        Ok(GeneratedValue::new(value))
    }
}

/// Built-in defaults by normalized type tag.
pub(crate) fn type_defaults() -> Vec<(&'static str, BuiltinGenerator)> {
    let mut defaults = Vec::new();
    for tag in [
        "character varying",
        "varchar",
        "character",
        "char",
        "bpchar",
        "text",
    ] {
        defaults.push((tag, BuiltinGenerator::Text));
    }
    for tag in ["smallint", "int2"] {
        defaults.push((tag, BuiltinGenerator::SmallInt));
    }
    for tag in ["integer", "int", "int4", "bigint", "int8", "numeric"] {
        defaults.push((tag, BuiltinGenerator::Integer));
    }
    for tag in ["boolean", "bool"] {
        defaults.push((tag, BuiltinGenerator::Boolean));
    }
    defaults.push(("date", BuiltinGenerator::Date));
    for tag in [
        "timestamp",
        "timestamp without time zone",
        "timestamp with time zone",
        "timestamptz",
    ] {
        defaults.push((tag, BuiltinGenerator::Timestamp));
    }
    defaults.push(("uuid", BuiltinGenerator::Uuid));
    defaults
}

/// Built-ins registered by bare column name.
pub(crate) fn standard_columns(email: EmailPolicy) -> Vec<(&'static str, BuiltinGenerator)> {
    vec![
        ("first_name", BuiltinGenerator::FirstName),
        ("last_name", BuiltinGenerator::LastName),
        ("email", BuiltinGenerator::Email(email)),
        ("phone", BuiltinGenerator::Phone),
        ("password", BuiltinGenerator::Password),
        ("password_hash", BuiltinGenerator::Password),
    ]
}

fn random_string(rng: &mut dyn RngCore, charset: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| charset[rng.random_range(0..charset.len())] as char)
        .collect()
}

fn date_bounds() -> (NaiveDateTime, NaiveDateTime) {
    let midnight = |year| {
        NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .unwrap_or_default()
    };
    (midnight(1999), midnight(2020))
}

fn interpolate(rng: &mut dyn RngCore) -> NaiveDateTime {
    let (start, end) = date_bounds();
    let span = (end - start).num_seconds();
    let fraction: f64 = rng.random();
    start + Duration::seconds((span as f64 * fraction) as i64)
}

fn pick_name(rng: &mut dyn RngCore, source: &[&str]) -> String {
    let raw = source.choose(rng).copied().unwrap_or_default();
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn email(rng: &mut dyn RngCore, policy: &EmailPolicy, table: &str) -> String {
    let domain = if policy.is_staff(table) {
        policy.staff_domain.clone()
    } else {
        random_string(rng, TEXT_CHARSET, 5)
    };
    let tld = TLDS.choose(rng).copied().unwrap_or("com");
    let local_len = rng.random_range(4..=10);
    let local = random_string(rng, EMAIL_LOCAL_CHARSET, local_len);
    format!("{local}@{domain}.{tld}")
}

fn password(rng: &mut dyn RngCore) -> GeneratedValue {
    let mut pool = PRINTABLE.to_vec();
    pool.shuffle(rng);
    let len = rng.random_range(PASSWORD_MIN..=PASSWORD_MAX);
    let plaintext = random_string(rng, &pool, len);

    let mut salt = [0u8; SALT_BYTES];
    rng.fill_bytes(&mut salt);
    let hashed = hash_password(&salt, &plaintext);

    GeneratedValue::with_display(Value::Text(hashed), plaintext)
}

/// `sha256$<salt hex>$<digest hex>` where the digest covers salt then password.
pub(crate) fn hash_password(salt: &[u8], plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(plaintext.as_bytes());
    format!(
        "sha256${}${}",
        hex::encode(salt),
        hex::encode(hasher.finalize())
    )
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn text_respects_max_length() {
        let mut rng = rng();
        let bounded = Column::new("t", "code", "varchar").with_max_length(4);
        let unbounded = Column::new("t", "body", "text");

        for _ in 0..200 {
            let value = BuiltinGenerator::Text.generate(&bounded, &mut rng).unwrap();
            let len = value.primary.as_str().unwrap().len();
            assert!((1..=4).contains(&len));

            let value = BuiltinGenerator::Text
                .generate(&unbounded, &mut rng)
                .unwrap();
            let len = value.primary.as_str().unwrap().len();
            assert!((DEFAULT_TEXT_MIN..=DEFAULT_TEXT_MAX).contains(&len));
        }
    }

    #[test]
    fn integers_stay_in_family_range() {
        let mut rng = rng();
        let small = Column::new("t", "rank", "smallint");
        for _ in 0..500 {
            let value = BuiltinGenerator::SmallInt.generate(&small, &mut rng).unwrap();
            let n = value.primary.as_i64().unwrap();
            assert!((1..=SMALLINT_MAX).contains(&n));
        }
    }

    #[test]
    fn dates_fall_between_bounds() {
        let mut rng = rng();
        let column = Column::new("t", "born", "date");
        let (start, end) = date_bounds();
        for _ in 0..200 {
            match BuiltinGenerator::Date.generate(&column, &mut rng).unwrap().primary {
                Value::Date(date) => assert!(date >= start.date() && date <= end.date()),
                other => panic!("expected date, got {other:?}"),
            }
        }
    }

    #[test]
    fn names_are_capitalized() {
        let mut rng = rng();
        let column = Column::new("person", "first_name", "text");
        let value = BuiltinGenerator::FirstName.generate(&column, &mut rng).unwrap();
        let name = value.primary.as_str().unwrap();
        assert!(name.chars().next().unwrap().is_uppercase());
        assert!(FIRST_NAMES.contains(&name.to_lowercase().as_str()));
    }

    #[test]
    fn staff_tables_use_organizational_domain() {
        let mut rng = rng();
        let policy = EmailPolicy {
            staff_tables: vec!["admin".to_string()],
            staff_domain: "acme".to_string(),
        };
        let generator = BuiltinGenerator::Email(policy);

        let staff = Column::new("public.admin", "email", "text");
        let address = generator.generate(&staff, &mut rng).unwrap().primary.to_string();
        assert!(address.contains("@acme."), "{address}");

        let customer = Column::new("customer", "email", "text");
        let address = generator
            .generate(&customer, &mut rng)
            .unwrap()
            .primary
            .to_string();
        let (local, rest) = address.split_once('@').unwrap();
        assert!((4..=10).contains(&local.len()));
        let (domain, tld) = rest.split_once('.').unwrap();
        assert_eq!(domain.len(), 5);
        assert!(TLDS.contains(&tld));
    }

    #[test]
    fn phone_has_country_prefix_and_twelve_digits() {
        let mut rng = rng();
        let column = Column::new("t", "phone", "text");
        let phone = BuiltinGenerator::Phone
            .generate(&column, &mut rng)
            .unwrap()
            .primary
            .to_string();
        let (country, digits) = phone.trim_start_matches('+').split_once(' ').unwrap();
        assert!(COUNTRY_CODES.contains(&country));
        assert_eq!(digits.len(), 12);
        assert!(digits.bytes().all(|b| PHONE_DIGITS.contains(&b)));
    }

    #[test]
    fn password_stores_hash_and_keeps_plaintext_for_display() {
        let mut rng = rng();
        let column = Column::new("account", "password", "text");
        let value = BuiltinGenerator::Password.generate(&column, &mut rng).unwrap();

        let plaintext = value.display.clone().unwrap();
        assert!((PASSWORD_MIN..=PASSWORD_MAX).contains(&plaintext.len()));

        let stored = value.primary.to_string();
        let parts: Vec<&str> = stored.split('$').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "sha256");
        assert!(!stored.contains(&plaintext));

        let salt = hex::decode(parts[1]).unwrap();
        assert_eq!(hash_password(&salt, &plaintext), stored);
        assert_eq!(stored.len(), HASHED_PASSWORD_LEN);
    }

    #[test]
    fn password_rejects_columns_shorter_than_the_hash() {
        let mut rng = rng();
        let short = Column::new("account", "password", "varchar").with_max_length(64);
        assert!(matches!(
            BuiltinGenerator::Password.generate(&short, &mut rng),
            Err(SynthesisError::Configuration(_))
        ));

        let exact = Column::new("account", "password", "varchar")
            .with_max_length(HASHED_PASSWORD_LEN as u32);
        assert!(BuiltinGenerator::Password.generate(&exact, &mut rng).is_ok());
    }

    #[test]
    fn ids_round_trip_through_lookup() {
        let policy = EmailPolicy::default();
        for id in BuiltinGenerator::IDS {
            let generator = BuiltinGenerator::from_id(id, &policy).unwrap();
            assert_eq!(generator.id(), *id);
        }
        assert!(BuiltinGenerator::from_id("builtin.geometry", &policy).is_none());
    }
}
