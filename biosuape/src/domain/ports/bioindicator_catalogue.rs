//! Driven port for the bioindicator species catalogue.

use async_trait::async_trait;

use crate::domain::Bioindicator;

use super::define_port_error;

define_port_error! {
    /// Errors raised by catalogue adapters.
    pub enum BioindicatorCatalogueError {
        /// The catalogue source could not be read.
        Unavailable { message: String } => "bioindicator catalogue unavailable: {message}",
    }
}

/// Port for listing bioindicator species.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BioindicatorCatalogue: Send + Sync {
    /// Every catalogued species, in catalogue order.
    async fn list(&self) -> Result<Vec<Bioindicator>, BioindicatorCatalogueError>;
}

/// Built-in catalogue of the species monitored in the Suape estuary.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureBioindicatorCatalogue;

#[async_trait]
impl BioindicatorCatalogue for FixtureBioindicatorCatalogue {
    async fn list(&self) -> Result<Vec<Bioindicator>, BioindicatorCatalogueError> {
        Ok(vec![
            Bioindicator {
                id: "1".to_owned(),
                popular_name: "Alga Marrom".to_owned(),
                scientific_name: "Sargassum sp.".to_owned(),
                description: "Alga comum em áreas costeiras. Sua grande presença pode indicar desequilíbrio nutricional.".to_owned(),
                indicator_role: "Indicador de eutrofização (excesso de nutrientes).".to_owned(),
                image_url: None,
            },
            Bioindicator {
                id: "2".to_owned(),
                popular_name: "Peixe-agulha".to_owned(),
                scientific_name: "Strongylura marina".to_owned(),
                description: "Peixe que vive em águas rasas. Sua saúde é um bom indicativo da qualidade da água.".to_owned(),
                indicator_role: "Indicador da saúde geral do ecossistema.".to_owned(),
                image_url: None,
            },
            Bioindicator {
                id: "3".to_owned(),
                popular_name: "Ostras".to_owned(),
                scientific_name: "Crassostrea gigas".to_owned(),
                description: "Moluscos filtradores. Acumulam poluentes e são sensíveis a variações na qualidade da água.".to_owned(),
                indicator_role: "Indicador de poluição por metais pesados e toxinas.".to_owned(),
                image_url: None,
            },
        ])
    }
}
