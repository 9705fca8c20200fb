//! SendGrid v3 API request/response types

use crate::domain::DnsRecord;
use serde::{Deserialize, Serialize};

const DEFAULT_RECORD_TYPE: &str = "TXT";
const DEFAULT_RECORD_TTL: u32 = 3600;

/// Body of `POST /v3/mail/send`
#[derive(Debug, Clone, Serialize)]
pub struct MailSendRequest {
    pub personalizations: Vec<Personalization>,
    pub from: SendGridEmail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<SendGridEmail>,
    pub subject: String,
    pub content: Vec<SendGridContent>,
}

/// One envelope; SendGrid delivers a separate copy per personalization
#[derive(Debug, Clone, Serialize)]
pub struct Personalization {
    pub to: Vec<SendGridEmail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendGridEmail {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendGridContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub value: String,
}

impl SendGridContent {
    /// text/plain must precede text/html
    pub fn alternatives(text: String, html: String) -> Vec<Self> {
        let mut content = Vec::with_capacity(2);
        if !text.is_empty() {
            content.push(Self {
                content_type: "text/plain".to_string(),
                value: text,
            });
        }
        if !html.is_empty() {
            content.push(Self {
                content_type: "text/html".to_string(),
                value: html,
            });
        }
        content
    }
}

/// Authenticated domain (`/v3/whitelabel/domains`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhitelabelDomain {
    #[serde(default)]
    pub id: Option<i64>,
    pub domain: String,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub valid: bool,
    /// Either an array of records or an object keyed by record purpose
    #[serde(default)]
    pub dns: serde_json::Value,
}

impl WhitelabelDomain {
    /// Records the restaurant has to publish. Missing fields fall back to TXT / 3600.
    pub fn dns_records(&self) -> Vec<DnsRecord> {
        let entries: Vec<&serde_json::Value> = match &self.dns {
            serde_json::Value::Array(items) => items.iter().collect(),
            serde_json::Value::Object(map) => map.values().collect(),
            _ => Vec::new(),
        };

        entries
            .into_iter()
            .filter(|v| v.is_object())
            .map(|record| DnsRecord {
                record_type: record
                    .get("type")
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_uppercase())
                    .unwrap_or_else(|| DEFAULT_RECORD_TYPE.to_string()),
                host: str_field(record, "host"),
                data: str_field(record, "data"),
                ttl: record
                    .get("ttl")
                    .and_then(|v| v.as_u64())
                    .and_then(|t| u32::try_from(t).ok())
                    .filter(|t| *t > 0)
                    .unwrap_or(DEFAULT_RECORD_TTL),
            })
            .collect()
    }
}

fn str_field(record: &serde_json::Value, key: &str) -> String {
    record
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDomainRequest {
    pub domain: String,
    pub subdomain: String,
    pub default: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSubuserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub ips: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubuserResponse {
    #[serde(default)]
    pub user_id: Option<serde_json::Value>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub username: Option<String>,
}

impl SubuserResponse {
    /// Upstream identifier, falling back to the username when none was returned
    pub fn sub_account_id(&self, username: &str) -> String {
        self.user_id
            .as_ref()
            .or(self.id.as_ref())
            .and_then(json_scalar_to_string)
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| username.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyResponse {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_id: Option<String>,
}

fn json_scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mail_send_request_shape() {
        let request = MailSendRequest {
            personalizations: vec![Personalization {
                to: vec![SendGridEmail {
                    email: "client@example.com".to_string(),
                    name: None,
                }],
            }],
            from: SendGridEmail {
                email: "resto_7@noreply.cartelia.app".to_string(),
                name: Some("Cartelia".to_string()),
            },
            reply_to: None,
            subject: "Bonjour".to_string(),
            content: SendGridContent::alternatives("hi".to_string(), "<p>hi</p>".to_string()),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["personalizations"][0]["to"][0]["email"], "client@example.com");
        assert!(value["personalizations"][0]["to"][0].get("name").is_none());
        assert!(value.get("reply_to").is_none());
        assert_eq!(value["content"][0]["type"], "text/plain");
        assert_eq!(value["content"][1]["type"], "text/html");
    }

    #[test]
    fn test_alternatives_skip_empty_parts() {
        let content = SendGridContent::alternatives(String::new(), "<p>x</p>".to_string());
        assert_eq!(content.len(), 1);
        assert_eq!(content[0].content_type, "text/html");
    }

    #[test]
    fn test_sub_account_id_fallbacks() {
        let numeric: SubuserResponse = serde_json::from_value(json!({"user_id": 4242})).unwrap();
        assert_eq!(numeric.sub_account_id("resto_1"), "4242");

        let id: SubuserResponse = serde_json::from_value(json!({"id": "abc"})).unwrap();
        assert_eq!(id.sub_account_id("resto_1"), "abc");

        let empty: SubuserResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.sub_account_id("resto_1"), "resto_1");
    }

    #[test]
    fn test_dns_records_from_array() {
        let domain: WhitelabelDomain = serde_json::from_value(json!({
            "domain": "bistrot.fr",
            "dns": [
                {"type": "cname", "host": "mail.bistrot.fr", "data": "u1.wl.sendgrid.net"},
                {"host": "bistrot.fr", "data": "v=spf1 include:sendgrid.net ~all", "ttl": 300}
            ]
        }))
        .unwrap();

        let records = domain.dns_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record_type, "CNAME");
        assert_eq!(records[0].ttl, 3600);
        assert_eq!(records[1].record_type, "TXT");
        assert_eq!(records[1].ttl, 300);
    }

    #[test]
    fn test_dns_records_from_object() {
        let domain: WhitelabelDomain = serde_json::from_value(json!({
            "domain": "bistrot.fr",
            "dns": {
                "mail_cname": {"valid": false, "type": "cname", "host": "mail.bistrot.fr", "data": "u1.wl.sendgrid.net"},
                "dkim1": {"valid": false, "type": "cname", "host": "s1._domainkey.bistrot.fr", "data": "s1.domainkey.u1.wl.sendgrid.net"}
            }
        }))
        .unwrap();

        let records = domain.dns_records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.record_type == "CNAME"));
        assert!(records.iter().any(|r| r.host == "s1._domainkey.bistrot.fr"));
    }

    #[test]
    fn test_whitelabel_domain_defaults() {
        let domain: WhitelabelDomain =
            serde_json::from_value(json!({"domain": "bistrot.fr"})).unwrap();
        assert!(!domain.valid);
        assert!(domain.dns.is_null());
        assert!(domain.dns_records().is_empty());
    }
}
