// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    En,
    Es,
}

impl Language {
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Self::En),
            "es" => Some(Self::Es),
            _ => None,
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::En => Self::Es,
            Self::Es => Self::En,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Text {
    PageTitle,
    TabMap,
    TabFieldWork,
    TabAcquisitions,
    TabStatistics,
    TabUmdDetails,
    Filters,
    Search,
    SearchPlaceholder,
    Position,
    PositionPlaceholder,
    Status,
    StatusPlaceholder,
    Team,
    TeamPlaceholder,
    FieldWorkType,
    FieldWorkTypePlaceholder,
    DateRange,
    From,
    To,
    ClearFilters,
    Results,
    ClickReport,
    Report,
    Photos,
    NoPhotos,
    ImageLoadError,
    ImageLink,
    ContainsPhotos,
    PhotosFetched,
    NoResults,
    SearchResults,
    EmptyResult,
    SeveralReports,
    NoReportFound,
    ColumnDate,
    ColumnName,
    ColumnId,
    ColumnModules,
    ColumnSummary,
    ColumnStatus,
    ColumnTeam,
    ColumnType,
    StatsHeader,
    StatsTimeFilter,
    StatsAllTime,
    StatsLastMonth,
    StatsLastQuarter,
    StatsLastYear,
    StatsAssembled,
    StatsInstalled,
    StatsPositions,
    StatsRate,
    StatsCombinedTitle,
    StatsShadedPeriods,
    NoData,
    SelectUmd,
    InstallationInfo,
    ModulePosition,
    ElectronicKit,
    ModuleDetails,
    RotationAngle,
    RadialDistance,
    PositionAngle,
    OtherModules,
    AssemblyIssues,
    NoIssuesReported,
    NoInstallationInfo,
    UnknownUmd,
    UmdLayout,
    UmdPosition,
    NoPlotData,
    Username,
    Password,
    LoginFailed,
    LoggedOut,
    MapHint,
    Support,
}

impl Text {
    pub const fn get(self, language: Language) -> &'static str {
        let (en, es) = self.pair();
        match language {
            Language::En => en,
            Language::Es => es,
        }
    }

    /// Fills each `{}` in the translated template with the next argument.
    pub fn fill(self, language: Language, args: &[&dyn std::fmt::Display]) -> String {
        let mut out = String::new();
        let mut args = args.iter();
        let mut pieces = self.get(language).split("{}").peekable();
        while let Some(piece) = pieces.next() {
            out.push_str(piece);
            if pieces.peek().is_some()
                && let Some(arg) = args.next()
            {
                out.push_str(&arg.to_string());
            }
        }
        out
    }

    const fn pair(self) -> (&'static str, &'static str) {
        match self {
            Self::PageTitle => (
                "Operations and monitoring - UMD",
                "Operaciones y monitoreo - AMIGA",
            ),
            Self::TabMap => ("Map", "Mapa"),
            Self::TabFieldWork => ("Field trips", "Salidas al campo"),
            Self::TabAcquisitions => ("Data Acquisition", "Adquisición de datos"),
            Self::TabStatistics => ("Statistics", "Estadísticas"),
            Self::TabUmdDetails => ("UMD Details", "Detalles UMD"),
            Self::Filters => ("Filters", "Filtros"),
            Self::Search => ("Search:", "Buscar:"),
            Self::SearchPlaceholder => ("Enter text to search...", "Ingrese texto para buscar..."),
            Self::Position => ("Position:", "Posición:"),
            Self::PositionPlaceholder => ("Select position", "Seleccionar posición"),
            Self::Status => ("Status:", "Estado:"),
            Self::StatusPlaceholder => (
                "Select status of the issue",
                "Seleccionar estado del problema",
            ),
            Self::Team => ("Team:", "Equipo:"),
            Self::TeamPlaceholder => ("Select team", "Seleccionar equipo"),
            Self::FieldWorkType => ("Field Work Type:", "Tipo de salida:"),
            Self::FieldWorkTypePlaceholder => {
                ("Select Field Work Type", "Seleccionar tipo de salida")
            }
            Self::DateRange => ("Date Range:", "Intervalo de fechas:"),
            Self::From => ("From:", "Desde:"),
            Self::To => ("To:", "Hasta:"),
            Self::ClearFilters => ("Clear filters", "Limpiar filtros"),
            Self::Results => ("Results", "Resultados"),
            Self::ClickReport => ("Select a row to view the report", "Seleccione una fila para ver el reporte"),
            Self::Report => ("Report", "Reporte"),
            Self::Photos => ("Photos", "Fotos"),
            Self::NoPhotos => (
                "No photos available for this entry.",
                "No hay fotos disponibles para esta entrada.",
            ),
            Self::ImageLoadError => ("Failed to load image:", "No se pudo cargar la imagen:"),
            Self::ImageLink => ("Link to image", "Enlace a la imagen"),
            Self::ContainsPhotos => ("Contains {} 📷", "Contiene {} 📷"),
            Self::PhotosFetched => (
                "Photos: {} cached, {} failed",
                "Fotos: {} en caché, {} con error",
            ),
            Self::NoResults => (
                "No results found for '{}'",
                "No se encontraron resultados para '{}'",
            ),
            Self::SearchResults => (
                "Found {} results for '{}'",
                "Se encontraron {} resultados para '{}'",
            ),
            Self::EmptyResult => (
                "No rows match the current filters",
                "Ninguna fila coincide con los filtros",
            ),
            Self::SeveralReports => (
                "There are several reports about this issue. Choose which one you want to see:",
                "Hay varios reportes sobre este problema. Elija cuál desea ver:",
            ),
            Self::NoReportFound => ("No report found", "No se encontró el reporte"),
            Self::ColumnDate => ("Date", "Fecha"),
            Self::ColumnName => ("Position", "Posición"),
            Self::ColumnId => ("Id", "Id"),
            Self::ColumnModules => ("Modules", "Módulos"),
            Self::ColumnSummary => ("Summary of issue", "Resumen del problema"),
            Self::ColumnStatus => ("Status", "Estado"),
            Self::ColumnTeam => ("Team", "Equipo"),
            Self::ColumnType => ("Field work type", "Tipo de salida"),
            Self::StatsHeader => ("Deployment progress", "Progreso del despliegue"),
            Self::StatsTimeFilter => ("Time period", "Período"),
            Self::StatsAllTime => ("All time", "Todo el período"),
            Self::StatsLastMonth => ("Last month", "Último mes"),
            Self::StatsLastQuarter => ("Last quarter", "Último trimestre"),
            Self::StatsLastYear => ("Last year", "Último año"),
            Self::StatsAssembled => ("UMDs assembled", "UMDs ensamblados"),
            Self::StatsInstalled => ("UMDs installed", "UMDs instalados"),
            Self::StatsPositions => ("Positions equipped", "Posiciones equipadas"),
            Self::StatsRate => ("Completion", "Avance"),
            Self::StatsCombinedTitle => (
                "Assembled and installed UMDs",
                "UMDs ensamblados e instalados",
            ),
            Self::StatsShadedPeriods => ("Shaded periods", "Períodos sombreados"),
            Self::NoData => ("No data available", "No hay datos disponibles"),
            Self::SelectUmd => ("Select UMD", "Seleccionar UMD"),
            Self::InstallationInfo => ("Installation info", "Información de instalación"),
            Self::ModulePosition => ("Module position:", "Posición del módulo:"),
            Self::ElectronicKit => ("Electronic kit:", "Kit electrónico:"),
            Self::ModuleDetails => ("Module details:", "Detalles del módulo:"),
            Self::RotationAngle => ("Rotation angle", "Ángulo de rotación"),
            Self::RadialDistance => ("Radial distance", "Distancia radial"),
            Self::PositionAngle => ("Position angle", "Ángulo de posición"),
            Self::OtherModules => ("Modules at this position:", "Módulos en esta posición:"),
            Self::AssemblyIssues => ("Assembly issues", "Problemas de ensamblado"),
            Self::NoIssuesReported => ("No issues reported", "Sin problemas reportados"),
            Self::NoInstallationInfo => (
                "No installation info for this UMD",
                "No hay información de instalación para este UMD",
            ),
            Self::UnknownUmd => (
                "UMD not found in the details sheet",
                "UMD no encontrado en la planilla de detalles",
            ),
            Self::UmdLayout => ("UMD layout", "Esquema del UMD"),
            Self::UmdPosition => ("UMD position", "Posición del UMD"),
            Self::NoPlotData => ("No plot data", "Sin datos para graficar"),
            Self::Username => ("Username", "Usuario"),
            Self::Password => ("Password", "Contraseña"),
            Self::LoginFailed => (
                "User not known or password incorrect",
                "Usuario desconocido o contraseña incorrecta",
            ),
            Self::LoggedOut => ("Logged out successfully!", "Sesión cerrada"),
            Self::MapHint => (
                "Open the deployment map in a browser:",
                "Abra el mapa del despliegue en un navegador:",
            ),
            Self::Support => (
                "For any issues with app usage, please contact the operations team.",
                "Ante cualquier problema con la aplicación, contacte al equipo de operaciones.",
            ),
        }
    }
}
