//! Built-in templates for the supported platforms.

use super::{
    CaseRule, EntityType, FieldSpec, FieldType, IdFormat, RelationshipSpec, SchemaTemplate,
};
use crate::vocabulary::{instruments, platforms, preservation_methods, tissue_types};

fn specimen_id() -> FieldSpec {
    FieldSpec::new("Specimen_ID", FieldType::String)
        .required()
        .described("Patient specimen identifier")
        .with_id_format(IdFormat::with_year("SPEC", 3))
        .with_case(CaseRule::Upper)
        .with_aliases(&["Sample_ID", "Sample_Name", "Specimen", "Patient_Sample"])
        .key_of(EntityType::Specimen)
}

fn block_id() -> FieldSpec {
    FieldSpec::new("Block_ID", FieldType::String)
        .required()
        .described("Tissue block identifier")
        .with_id_format(IdFormat::with_year("BLK", 3))
        .with_case(CaseRule::Upper)
        .with_aliases(&["Block", "Tissue_Block", "FFPE_Block"])
        .key_of(EntityType::Block)
}

fn slide_id() -> FieldSpec {
    FieldSpec::new("Slide_ID", FieldType::String)
        .required()
        .described("Slide barcode")
        .with_id_format(IdFormat::with_year("SLD", 4))
        .with_case(CaseRule::Upper)
        .with_aliases(&["Slide_Barcode", "Slide", "Barcode"])
        .key_of(EntityType::Slide)
}

fn roi_id() -> FieldSpec {
    FieldSpec::new("ROI_ID", FieldType::String)
        .required()
        .described("Region of interest identifier")
        .with_id_format(IdFormat::serial("ROI", 3))
        .with_case(CaseRule::Upper)
        .with_aliases(&["ROI", "Region", "Region_ID", "AOI_ID", "FOV"])
        .key_of(EntityType::Roi)
}

fn library_id() -> FieldSpec {
    FieldSpec::new("Library_ID", FieldType::String)
        .required()
        .described("Sequencing library identifier")
        .with_id_format(IdFormat::with_year("LIB", 3))
        .with_case(CaseRule::Upper)
        .with_aliases(&["Library", "Lib_ID", "Library_Name"])
        .key_of(EntityType::Library)
}

fn run_id() -> FieldSpec {
    FieldSpec::new("Run_ID", FieldType::String)
        .required()
        .described("Instrument run identifier")
        .with_id_format(IdFormat::with_year("RUN", 3))
        .with_case(CaseRule::Upper)
        .with_aliases(&["Run", "Run_Name", "Sequencing_Run"])
        .key_of(EntityType::Run)
}

fn platform() -> FieldSpec {
    FieldSpec::enumerated("Platform", &platforms::vocabulary())
        .required()
        .described("Acquisition platform")
        .with_aliases(&["Technology", "Instrument_Platform"])
        .attribute_of(EntityType::Run)
}

fn tissue_type() -> FieldSpec {
    FieldSpec::enumerated("Tissue_Type", &tissue_types::vocabulary())
        .described("Tissue type and preservation state")
        .with_aliases(&["Tissue", "Sample_Type"])
        .attribute_of(EntityType::Specimen)
}

fn preservation() -> FieldSpec {
    FieldSpec::enumerated("Preservation", &preservation_methods::vocabulary())
        .described("Block preservation method")
        .with_aliases(&["Preservation_Method", "Fixation"])
        .attribute_of(EntityType::Block)
}

fn collection_date() -> FieldSpec {
    FieldSpec::new("Collection_Date", FieldType::Date)
        .described("Specimen collection date")
        .with_aliases(&["Date_Collected", "Collection", "Procurement_Date"])
        .attribute_of(EntityType::Specimen)
}

fn kit_version() -> FieldSpec {
    FieldSpec::new("Kit_Version", FieldType::String)
        .described("Reagent kit version")
        .with_pattern(r"v\d+(\.\d+)*")
        .with_case(CaseRule::Lower)
        .with_aliases(&["Kit", "Reagent_Kit", "Chemistry_Version"])
        .attribute_of(EntityType::Library)
}

fn notes() -> FieldSpec {
    FieldSpec::new("Notes", FieldType::String)
        .described("Free-text notes")
        .with_aliases(&["Comments", "Comment", "Remarks"])
}

fn spatial_hierarchy() -> Vec<RelationshipSpec> {
    vec![
        RelationshipSpec::has_many(EntityType::Specimen, EntityType::Block),
        RelationshipSpec::has_many(EntityType::Block, EntityType::Slide),
    ]
}

fn cosmx() -> SchemaTemplate {
    let mut relationships = spatial_hierarchy();
    relationships.extend([
        RelationshipSpec::has_many(EntityType::Slide, EntityType::Roi),
        RelationshipSpec::has_many(EntityType::Roi, EntityType::Library),
        RelationshipSpec::belongs_to(EntityType::Library, EntityType::Run),
    ]);
    SchemaTemplate {
        id: "cosmx".to_string(),
        version: "1.2".to_string(),
        name: "CosMx SMI".to_string(),
        vendor: "NanoString".to_string(),
        category: "Spatial Transcriptomics".to_string(),
        description: "Single-cell spatial imaging with FOV-level libraries".to_string(),
        fields: vec![
            specimen_id(),
            block_id(),
            slide_id(),
            roi_id(),
            library_id(),
            run_id(),
            platform(),
            tissue_type(),
            collection_date(),
            kit_version(),
            notes(),
        ],
        relationships,
    }
}

fn geomx() -> SchemaTemplate {
    let mut relationships = spatial_hierarchy();
    relationships.extend([
        RelationshipSpec::has_many(EntityType::Slide, EntityType::Roi),
        RelationshipSpec::has_many(EntityType::Roi, EntityType::Library),
        RelationshipSpec::belongs_to(EntityType::Library, EntityType::Run),
    ]);
    SchemaTemplate {
        id: "geomx".to_string(),
        version: "2.0".to_string(),
        name: "GeoMx DSP".to_string(),
        vendor: "NanoString".to_string(),
        category: "Spatial Proteogenomics".to_string(),
        description: "Digital spatial profiling of user-selected areas of illumination".to_string(),
        fields: vec![
            specimen_id(),
            block_id(),
            slide_id(),
            roi_id(),
            FieldSpec::new("AOI_Area", FieldType::Int)
                .described("Area of illumination in square micrometres")
                .with_pattern(r"[1-9]\d*")
                .with_aliases(&["Area", "AOI_Surface_Area"])
                .attribute_of(EntityType::Roi),
            library_id(),
            run_id(),
            platform(),
            tissue_type(),
            preservation(),
            collection_date(),
            kit_version(),
            notes(),
        ],
        relationships,
    }
}

fn visium_hd() -> SchemaTemplate {
    let mut relationships = spatial_hierarchy();
    relationships.extend([
        RelationshipSpec::has_many(EntityType::Slide, EntityType::Library),
        RelationshipSpec::belongs_to(EntityType::Library, EntityType::Run),
    ]);
    SchemaTemplate {
        id: "visium-hd".to_string(),
        version: "1.5".to_string(),
        name: "Visium HD".to_string(),
        vendor: "10x Genomics".to_string(),
        category: "Spatial Transcriptomics".to_string(),
        description: "Whole-transcriptome spatial capture at 2 µm resolution".to_string(),
        fields: vec![
            specimen_id(),
            block_id(),
            slide_id(),
            FieldSpec::new("Capture_Area", FieldType::String)
                .required()
                .described("Capture area on the slide")
                .with_pattern(r"[A-D]1")
                .with_case(CaseRule::Upper)
                .with_aliases(&["Area", "Capture_Area_ID"])
                .attribute_of(EntityType::Slide),
            library_id(),
            run_id(),
            platform(),
            tissue_type(),
            preservation(),
            collection_date(),
            kit_version(),
            notes(),
        ],
        relationships,
    }
}

fn xenium() -> SchemaTemplate {
    let mut relationships = spatial_hierarchy();
    relationships.push(RelationshipSpec::belongs_to(EntityType::Slide, EntityType::Run));
    SchemaTemplate {
        id: "xenium".to_string(),
        version: "1.0".to_string(),
        name: "Xenium In Situ".to_string(),
        vendor: "10x Genomics".to_string(),
        category: "In Situ Imaging".to_string(),
        description: "Subcellular in situ transcript detection".to_string(),
        fields: vec![
            specimen_id(),
            block_id(),
            slide_id(),
            run_id(),
            platform(),
            FieldSpec::new("Panel", FieldType::String)
                .described("Gene panel name")
                .with_aliases(&["Gene_Panel", "Panel_Name"])
                .attribute_of(EntityType::Slide),
            tissue_type(),
            preservation(),
            collection_date(),
            notes(),
        ],
        relationships,
    }
}

fn illumina_run() -> SchemaTemplate {
    SchemaTemplate {
        id: "illumina-run".to_string(),
        version: "3.0".to_string(),
        name: "Illumina Run Sheet".to_string(),
        vendor: "Illumina".to_string(),
        category: "Sequencing".to_string(),
        description: "Sample sheet of a sequencing run".to_string(),
        fields: vec![
            specimen_id(),
            library_id(),
            FieldSpec::new("Index_Sequence", FieldType::String)
                .described("Library index sequence")
                .with_pattern("[ACGTN]+")
                .with_case(CaseRule::Upper)
                .with_aliases(&["Index", "Barcode_Sequence", "I7_Index"])
                .attribute_of(EntityType::Library),
            FieldSpec::new("Lane", FieldType::Int)
                .described("Flow cell lane")
                .with_pattern("[1-8]")
                .attribute_of(EntityType::Library),
            run_id(),
            FieldSpec::enumerated("Instrument", &instruments::vocabulary())
                .required()
                .described("Sequencing instrument")
                .with_aliases(&["Sequencer", "Instrument_Model"])
                .attribute_of(EntityType::Run),
            FieldSpec::new("Flowcell_ID", FieldType::String)
                .described("Flow cell barcode")
                .with_pattern("[A-Z0-9]{9,10}")
                .with_case(CaseRule::Upper)
                .with_aliases(&["Flowcell", "Flow_Cell"])
                .attribute_of(EntityType::Run),
            FieldSpec::new("Read_Length", FieldType::Int)
                .described("Read length in cycles")
                .with_aliases(&["Cycles", "Read_Cycles"])
                .attribute_of(EntityType::Run),
            FieldSpec::new("Run_Date", FieldType::Date)
                .described("Run start date")
                .with_aliases(&["Date", "Sequencing_Date"])
                .attribute_of(EntityType::Run),
            notes(),
        ],
        relationships: vec![
            RelationshipSpec::has_many(EntityType::Specimen, EntityType::Library),
            RelationshipSpec::belongs_to(EntityType::Library, EntityType::Run),
        ],
    }
}

/// Every built-in template
pub(super) fn templates() -> Vec<SchemaTemplate> {
    vec![cosmx(), geomx(), visium_hd(), xenium(), illumina_run()]
}
