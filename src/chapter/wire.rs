use serde::Deserialize;

/* ---------- at-home/server/{id} ---------- */

#[derive(Deserialize)]
pub(crate) struct AtHomeEnvelope {
    #[allow(dead_code)]
    pub(crate) result: Option<String>,
    #[serde(rename = "baseUrl")]
    pub(crate) base_url: Option<String>,
    pub(crate) chapter: Option<AtHomeChapter>,
}

#[derive(Deserialize)]
pub(crate) struct AtHomeChapter {
    pub(crate) hash: Option<String>,
    #[serde(default)]
    pub(crate) data: Vec<String>,
    #[serde(rename = "dataSaver", default)]
    pub(crate) data_saver: Vec<String>,
}
