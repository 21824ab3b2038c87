//! Raw response types of the upstream results service.
//!
//! Field names follow the upstream JSON. Lists and amounts are optional
//! because different games omit or null them. Scalar fields read `null` as
//! their zero value.

use serde::{Deserialize, Deserializer};

/// Deserialize a missing or `null` value as `T::default()`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One contest as returned by `GET <base>/<game>/<contest>`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamDraw {
    pub numero: u32,
    #[serde(default)]
    pub data_apuracao: Option<String>,
    #[serde(default)]
    pub local_sorteio: Option<String>,
    #[serde(default, rename = "nomeMunicipioUFSorteio")]
    pub nome_municipio_uf_sorteio: Option<String>,
    #[serde(default)]
    pub dezenas_sorteadas_ordem_sorteio: Option<Vec<String>>,
    #[serde(default)]
    pub lista_dezenas: Option<Vec<String>>,
    #[serde(default)]
    pub lista_dezenas_segundo_sorteio: Option<Vec<String>>,
    #[serde(default)]
    pub trevos_sorteados: Option<Vec<String>>,
    #[serde(default)]
    pub nome_time_coracao_mes_sorte: Option<String>,
    #[serde(default)]
    pub lista_rateio_premio: Option<Vec<UpstreamPrizeTier>>,
    #[serde(default, rename = "listaMunicipioUFGanhadores")]
    pub lista_municipio_uf_ganhadores: Option<Vec<UpstreamWinnerLocation>>,
    #[serde(default)]
    pub observacao: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub acumulado: bool,
    #[serde(default)]
    pub data_proximo_concurso: Option<String>,
    #[serde(default)]
    pub valor_arrecadado: Option<f64>,
    #[serde(default, rename = "valorAcumuladoConcurso_0_5")]
    pub valor_acumulado_concurso_0_5: Option<f64>,
    #[serde(default)]
    pub valor_acumulado_concurso_especial: Option<f64>,
    #[serde(default)]
    pub valor_acumulado_proximo_concurso: Option<f64>,
    #[serde(default)]
    pub valor_estimado_proximo_concurso: Option<f64>,
    #[serde(default, rename = "numeroConcursoProximo")]
    pub numero_concurso_proximo: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamPrizeTier {
    #[serde(default, deserialize_with = "null_as_default")]
    pub descricao_faixa: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub faixa: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub numero_de_ganhadores: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub valor_premio: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamWinnerLocation {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ganhadores: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub municipio: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub posicao: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uf: String,
    #[serde(default)]
    pub serie: Option<String>,
    #[serde(default)]
    pub numero_bilhete: Option<String>,
}
