//! Built-in transform catalogue for Hades GUI resource files, plus the
//! save-profile resolution rewrite.
//!
//! Each entry maps a resource file (relative to the SJSON data root) to the
//! transform tree applied to it. Derived per game version by diffing GUI
//! layouts at different resolutions.

use crate::screen::Screen;
use crate::sjson::{Map, Value};
use crate::tree::{FieldRule, LeafRule, NodeTransform, ValueOp};
use std::path::PathBuf;

fn recenter() -> Vec<FieldRule> {
    vec![
        FieldRule::new("X", ValueOp::RecenterX),
        FieldRule::new("Y", ValueOp::RecenterY),
    ]
}

fn recenter_x_fixed_bottom() -> Vec<FieldRule> {
    vec![
        FieldRule::new("X", ValueOp::RecenterX),
        FieldRule::new("Y", ValueOp::FixedFromBottom),
    ]
}

fn reposition_x_from_left() -> Vec<FieldRule> {
    vec![FieldRule::new("X", ValueOp::FixedFromLeft)]
}

fn reposition_x_from_right() -> Vec<FieldRule> {
    vec![FieldRule::new("X", ValueOp::FixedFromRight { center_hud: None })]
}

/// Full-screen backings stretch to the new edges regardless of HUD mode.
fn resize() -> Vec<FieldRule> {
    vec![
        FieldRule::new(
            "Width",
            ValueOp::FixedFromRight {
                center_hud: Some(false),
            },
        ),
        FieldRule::new("Height", ValueOp::FixedFromBottom),
    ]
}

fn rescale() -> Vec<FieldRule> {
    vec![
        FieldRule::with_default("ScaleX", ValueOp::RescaleX, Value::Int(1)),
        FieldRule::with_default("ScaleY", ValueOp::RescaleY, Value::Int(1)),
    ]
}

fn rescale_uniform() -> Vec<FieldRule> {
    vec![
        FieldRule::with_default("ScaleX", ValueOp::Rescale, Value::Int(1)),
        FieldRule::with_default("ScaleY", ValueOp::Rescale, Value::Int(1)),
    ]
}

fn offset_thing_scale_05() -> Vec<FieldRule> {
    vec![FieldRule::with_default(
        "Thing",
        ValueOp::AddOffset { fallback_scale: 0.5 },
        Value::Map(Map::new()),
    )]
}

fn named(name: &str, fields: Vec<FieldRule>) -> LeafRule {
    LeafRule::IfSibling {
        key: "Name".to_string(),
        equals: name.to_string(),
        fields,
    }
}

fn child(name: &str, fields: Vec<FieldRule>) -> (String, NodeTransform) {
    (
        name.to_string(),
        NodeTransform::Leaf(vec![LeafRule::Update(fields)]),
    )
}

fn screen(root: &str, children: Vec<(String, NodeTransform)>) -> NodeTransform {
    NodeTransform::Map(vec![(root.to_string(), NodeTransform::Map(children))])
}

fn animations(rules: Vec<LeafRule>) -> NodeTransform {
    NodeTransform::Map(vec![("Animations".to_string(), NodeTransform::Seq(rules))])
}

/// The transform catalogue: relative resource path and the tree to apply.
pub fn transforms() -> Vec<(PathBuf, NodeTransform)> {
    let mut entries: Vec<(PathBuf, NodeTransform)> = Vec::new();
    let mut add = |path: &str, transform: NodeTransform| {
        entries.push((PathBuf::from(path), transform));
    };

    add(
        "Animations/Fx.sjson",
        animations(vec![
            // Vignettes displayed when hit by lava / poison / boiling blood
            named("LavaVignetteA", rescale()),
            named("PoisonVignetteLoop", rescale()),
            named("HadesBloodstoneVignette", rescale()),
            // Fullscreen displacement overlay FX
            named("FullscreenAlertDisplace", rescale()),
            named("BoonInteractDisplace", rescale()),
            named("FullscreenChaosDisplace", rescale()),
            named("FullscreenChaosDisplaceRings", rescale_uniform()),
            named("FullscreenAlertColor", rescale()),
            named("FullscreenAlertColorDark", rescale()),
            named("FullscreenAlertColorInvert", rescale()),
            named("LegendaryAspectSnow", rescale()),
            named("WeaponKitProphecyStreaks", rescale()),
            named("WeaponKitInteractVignette", rescale()),
            named("WeaponKitInteractVignetteOverlay", rescale()),
            // Assist / summon overlays
            named("WrathPresentationStreak", rescale()),
            named("WrathPresentationBottomDivider", rescale()),
            named("WrathVignette", rescale()),
        ]),
    );

    add(
        "Animations/GUIAnimations.sjson",
        animations(vec![
            // Vignette displayed when hit
            named("BloodFrame", rescale()),
            // Vignette displayed on low health
            named("LowHealthShroud", rescale()),
            // Room transitions
            named("RoomTransitionIn", rescale()),
            named("RoomTransitionInBlack", rescale()),
            named("RoomTransitionInBoatRide", rescale()),
            named("RoomTransitionOutBoatRide", rescale()),
            // Dialogue backgrounds
            named("DialogueBackgroundIn", rescale()),
            // Main vignette overlay
            named("VignetteOverlay", rescale()),
        ]),
    );

    add(
        "GUI/AboutScreen.sjson",
        screen(
            "AboutScreen",
            vec![
                child("Back", resize()),
                child("AnimatedBackground", recenter()),
                child("TitleText", recenter()),
                child("UpArrow", recenter()),
                child("DownArrow", recenter()),
                child("CreditText", recenter()),
                child("CancelButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/AnnouncementScreen.sjson",
        screen(
            "AnnouncementScreen",
            vec![
                child("Back", resize()),
                child("AnimatedBackground", recenter()),
                child("TitleText", recenter()),
                child("SubHeader", recenter()),
                child("UpArrow", recenter()),
                child("DownArrow", recenter()),
                child("AnnouncementText", recenter()),
                child("CancelButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/CloudSaveUploadDialog.sjson",
        screen(
            "CloudSaveUploadDialog",
            vec![
                child("AnimatedBackground", recenter()),
                child("TitleText", recenter()),
                child("MessageText", recenter()),
                child("TextBackground", recenter()),
                child("ConfirmButton", recenter()),
                child("CancelButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/CloudSettingsScreen.sjson",
        screen(
            "CloudSettingsScreen",
            vec![
                child("Back", resize()),
                child("AnimatedBackground", recenter()),
                child("TitleText", recenter()),
                child("ConnectSteamButton", recenter()),
                child("CancelButton", recenter()),
                child("DescriptionBox", recenter()),
            ],
        ),
    );

    add(
        "GUI/CloudSyncDialog.sjson",
        screen(
            "CloudSyncDialog",
            vec![
                child("Back", resize()),
                child("AnimatedBackground", recenter()),
                child("TitleText", recenter()),
                child("MessageText", recenter()),
                child("TextBackground", recenter()),
                child("ConfirmButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/DebugDrawGroupScreen.sjson",
        screen(
            "DebugDrawGroupScreen",
            vec![child("CancelButton", recenter())],
        ),
    );

    add(
        "GUI/DebugKeyScreen.sjson",
        screen(
            "DebugKeyScreen",
            vec![
                child("Back", resize()),
                child("DebugKeyButton", reposition_x_from_left()),
                child("LeftArrow", recenter()),
                child("FileFilter", reposition_x_from_left()),
                child("CancelButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/DownloadScreen.sjson",
        screen(
            "DownloadScreen",
            vec![
                child("Character", recenter()),
                child("ProgressBar", recenter()),
                child("ProgressText", recenter()),
            ],
        ),
    );

    add(
        "GUI/ExitConfirmDialog.sjson",
        screen(
            "ExitConfirmDialog",
            vec![
                child("Back", resize()),
                child("AnimatedBackground", recenter()),
                child("TitleText", recenter()),
                child("PromptText", recenter()),
                child("TextBackground", recenter()),
                child("ConfirmButton", recenter()),
                child("CancelButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/InGameUI.sjson",
        screen(
            "InGameUI",
            vec![
                child("UseText", resize()),
                child("SubtitlesABacking", recenter_x_fixed_bottom()),
                child("SubtitlesBBacking", recenter_x_fixed_bottom()),
                child("BuildNumberText", reposition_x_from_right()),
                child("ElapsedRunTimeText", reposition_x_from_right()),
                child(
                    "ElapsedBiomeTimeText",
                    vec![
                        FieldRule::new("X", ValueOp::FixedFromLeft),
                        FieldRule::new("Y", ValueOp::FixedFromBottom),
                    ],
                ),
                child("ActiveShrinePointText", reposition_x_from_left()),
                child("SaveAnim", reposition_x_from_right()),
            ],
        ),
    );

    add(
        "GUI/KeyMappingScreen.sjson",
        screen(
            "KeyMappingScreen",
            vec![
                child("Back", resize()),
                child("AnimatedBackground", recenter()),
                child("AnimatedBackgroundTop", recenter()),
                child("TitleText", recenter()),
                child("ControlLabel", recenter()),
                child("InfoPanel", recenter()),
                child("InfoText", recenter()),
                child("DefaultsButton", recenter()),
                child("RemapInstructions", recenter()),
                child("CancelButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/LanguageScreen.sjson",
        screen(
            "LanguageScreen",
            vec![
                child("Back", resize()),
                child("AnimatedBackground", recenter()),
                child("TitleText", recenter()),
                child("LanguageButton", recenter()),
                child("CancelButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/LaunchScreen.sjson",
        screen(
            "LaunchScreen",
            vec![
                child("AnimatedBackground", recenter()),
                child("ProgressBar", recenter()),
                child("WorkText", recenter()),
                child("DebugHintText", recenter()),
            ],
        ),
    );

    add(
        "GUI/LoadMapScreen.sjson",
        screen(
            "LoadMapScreen",
            vec![
                child("Back", resize()),
                child("MapButton", reposition_x_from_left()),
                child("LeftArrow", recenter()),
                child("FileFilter", reposition_x_from_left()),
                child("AlphabeticalSortButton", recenter()),
                child("ChronologicalSortButton", recenter()),
                child("CancelButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/LoadReplayScreen.sjson",
        screen(
            "LoadReplayScreen",
            vec![child("CancelButton", recenter())],
        ),
    );

    add(
        "GUI/LoadSaveScreen.sjson",
        screen(
            "LoadSaveScreen",
            vec![
                child("Back", resize()),
                child("SaveFileButton", reposition_x_from_left()),
                child("CancelButton", recenter()),
                child("LeftArrow", recenter()),
                child("FileFilter", reposition_x_from_left()),
                child("AlphabeticalSortButton", recenter()),
                child("ChronologicalSortButton", recenter()),
                child("LoadSpinner", recenter()),
                child("NotableSaveInfo", recenter()),
                child("RareFormat", recenter()),
            ],
        ),
    );

    add(
        "GUI/LoadScreen.sjson",
        screen(
            "LoadScreen",
            vec![
                child("AnimatedBackground", recenter()),
                child("ProgressBar", recenter()),
            ],
        ),
    );

    add(
        "GUI/MainMenuScreen.sjson",
        screen(
            "MainMenuScreen",
            vec![
                child("Front", resize()),
                child("AnimatedBackground", recenter()),
                child("Logo", recenter()),
                child("Character", recenter()),
                child("UpdateTitleBacking", recenter()),
                child("FullScreenFade", recenter()),
                child("PlayGameButton", recenter()),
                child("NextUpdateButton", recenter()),
                child("UpdateTitleText", recenter()),
                child("FeedbackButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/MenuScreen.sjson",
        screen("MenuScreen", vec![child("InfoPanel", recenter())]),
    );

    add(
        "GUI/MessageDialog.sjson",
        screen(
            "MessageDialog",
            vec![
                child("Back", resize()),
                child("AnimatedBackground", recenter()),
                child("TitleText", recenter()),
                child("MessageText", recenter()),
                child("TextBackground", recenter()),
                child("ConfirmButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/MessageDialogLarge.sjson",
        screen(
            "MessageDialogLarge",
            vec![
                child("Back", resize()),
                child("AnimatedBackground", recenter()),
                child("TitleText", recenter()),
                child("MessageText", recenter()),
                child("TextBackground", recenter()),
                child("ConfirmButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/MiscSettingsScreen.sjson",
        screen(
            "MiscSettingsScreen",
            vec![
                child("Back", resize()),
                child("AnimatedBackground", recenter()),
                child("TitleText", recenter()),
                child("BrightnessLabel", recenter()),
                child("BrightnessSlider", recenter()),
                child("MasterLabel", recenter()),
                child("MasterSlider", recenter()),
                child("DescriptionBox", recenter()),
                child("InfoPanel", recenter()),
                child("InfoText", recenter()),
                child("CancelButton", recenter()),
                child("XButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/PatchNotesScreen.sjson",
        screen(
            "PatchNotesScreen",
            vec![
                child("Back", resize()),
                child("AnimatedBackground", recenter()),
                child("TitleText", recenter()),
                child("SubHeader", recenter()),
                child("ScrollBar", recenter()),
                child("ScrollBarTracker", recenter()),
                child("UpArrow", recenter()),
                child("DownArrow", recenter()),
                child("AnnouncementText", recenter()),
                child("CancelButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/PauseScreen.sjson",
        screen(
            "PauseScreen",
            vec![
                child("Back", resize()),
                child("AnimatedBackground", recenter()),
                child("TitleText", recenter()),
                child("ResumeGameButton", recenter()),
                child("LastSaveTimeHint", recenter()),
            ],
        ),
    );

    add(
        "GUI/ProfileScreen.sjson",
        screen(
            "ProfileScreen",
            vec![
                child("Back", resize()),
                child("AnimatedBackground", recenter()),
                child("FullScreenFade", recenter()),
                child("TitleText", recenter()),
                child("ContinueGameButton", recenter()),
                child("SaveSpinnerHint", recenter()),
                child("InstructionHint", recenter()),
                child("ProfileButton", recenter()),
                child("HardModeButton", recenter()),
                child("DeleteButton", recenter()),
                child("InfoPanel", recenter()),
                child("InfoText", recenter()),
                child("CancelButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/RemoteProfileScreen.sjson",
        screen(
            "RemoteProfileScreen",
            vec![
                child("Back", resize()),
                child("AnimatedBackground", recenter()),
                child("FullScreenFade", recenter()),
                child("TitleText", recenter()),
                child("ContinueGameButton", recenter()),
                child("SaveSpinnerHint", recenter()),
                child("InstructionHint", recenter()),
                child("ProfileButton", recenter()),
                child("HardModeButton", recenter()),
                child("DeleteButton", recenter()),
                child("InfoPanel", recenter()),
                child("InfoText", recenter()),
                child("CancelButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/ResolutionScreen.sjson",
        screen(
            "ResolutionScreen",
            vec![
                child("Back", resize()),
                child("AnimatedBackground", recenter()),
                child("TitleText", recenter()),
                child("ResolutionButton", recenter()),
                child("ConfirmButton", recenter()),
                child("CancelButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/SettingsMenuScreen.sjson",
        screen(
            "SettingsMenuScreen",
            vec![
                child("Back", resize()),
                child("AnimatedBackground", recenter()),
                child("TitleText", recenter()),
                child("SettingsButton", recenter()),
                child("CancelButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/StartNewGameScreen.sjson",
        screen(
            "StartNewGameScreen",
            vec![
                child("Back", resize()),
                child("AnimatedBackground", recenter()),
                child("FullScreenFade", recenter()),
                child("TitleText", recenter()),
                child("StartNewGameHint", recenter()),
                child("ConfirmButton", recenter()),
                child("SubtitlesButton", recenter()),
                child("DescriptionBox", recenter()),
                child("CancelButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/SVNLockDialog.sjson",
        screen(
            "SVNLockDialog",
            vec![
                child("AnimatedBackground", recenter()),
                child("TitleText", recenter()),
                child("PromptText", recenter()),
                child("TextBackground", recenter()),
                child("ConfirmButton", recenter()),
                // This cancel button has no Y of its own.
                child("CancelButton", vec![FieldRule::new("X", ValueOp::RecenterX)]),
                child("XButton", recenter()),
            ],
        ),
    );

    add(
        "GUI/ThreeWayDialog.sjson",
        screen(
            "ThreeWayDialog",
            vec![
                child("Back", resize()),
                child("AnimatedBackground", recenter()),
                child("TitleText", recenter()),
                child("PromptText", recenter()),
                child("TextBackground", recenter()),
                child("ConfirmButton", recenter()),
                child("ConfirmAlternateButton", recenter()),
                child("CancelButton", recenter()),
            ],
        ),
    );

    add(
        "Obstacles/GUI.sjson",
        NodeTransform::Map(vec![(
            "Obstacles".to_string(),
            NodeTransform::Seq(vec![
                // Trait UI bottom decor
                named("TraitTrayDecor_Artemis", offset_thing_scale_05()),
                named("TraitTrayDecor_Chaos", offset_thing_scale_05()),
                named("TraitTrayDecor_Music", offset_thing_scale_05()),
                named("TraitTrayDecor_Hades", offset_thing_scale_05()),
                named("TraitTrayDecor_Chthonic", offset_thing_scale_05()),
                named("TraitTrayDecor_Blood", offset_thing_scale_05()),
                named("TraitTrayDecor_Heat", offset_thing_scale_05()),
                named("TraitTrayDecor_Stone", offset_thing_scale_05()),
                named("TraitTrayDecor_Love", offset_thing_scale_05()),
            ]),
        )]),
    );

    entries
}

pub const WINDOW_XY_DEFAULT_OFFSET: i64 = 100;
pub const WINDOW_XY_OVERFLOW_THRESHOLD: i64 = 32767;

/// Rewrite a save profile's resolution fields to the actual display
/// resolution.
///
/// `WindowX`/`WindowY` are clamped back to a small offset when absent or
/// overflowed, so a custom resolution larger than the monitor officially
/// supports cannot leave the window stranded offscreen in windowed mode.
pub fn apply_profile(document: &Value, resolution: Screen) -> Value {
    let Some(map) = document.as_map() else {
        return document.clone();
    };
    let mut patched = map.clone();
    for key in ["X", "WindowWidth"] {
        patched.insert(key, Value::Int(i64::from(resolution.width)));
    }
    for key in ["Y", "WindowHeight"] {
        patched.insert(key, Value::Int(i64::from(resolution.height)));
    }
    for key in ["WindowX", "WindowY"] {
        let overflowed = matches!(
            patched.get(key),
            Some(Value::Int(n)) if *n >= WINDOW_XY_OVERFLOW_THRESHOLD
        );
        if overflowed || !patched.contains_key(key) {
            patched.insert(key, Value::Int(WINDOW_XY_DEFAULT_OFFSET));
        }
    }
    Value::Map(patched)
}
